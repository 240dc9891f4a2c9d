use super::executor::ThreadScheduler;
use crate::error::Result;

use serde::Deserialize;

use std::thread;

/// Serializable configuration of a [`ThreadScheduler`].
///
/// Every field is optional when deserializing; missing fields fall back to
/// [`SchedulerConfig::default`].
///
/// # Examples
///
/// ```rust,ignore
/// let config: SchedulerConfig = toml::from_str(r#"
///     thread_name = "listen-stream"
///     stack_size = 262144
/// "#)?;
/// let scheduler = SchedulerBuilder::from_config(&config).build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Name given to the worker thread.
    pub thread_name: String,

    /// Stack size of the worker thread in bytes, or the platform default.
    pub stack_size: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name: String::from("sequent-worker"),
            stack_size: None,
        }
    }
}

/// Builder for configuring and creating a [`ThreadScheduler`].
///
/// # Examples
///
/// ```rust,ignore
/// let scheduler = SchedulerBuilder::new()
///     .thread_name("write-stream")
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
}

impl SchedulerBuilder {
    /// Creates a new `SchedulerBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder starting from an existing configuration.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Sets the name of the worker thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Sets the stack size of the worker thread.
    ///
    /// # Panics
    ///
    /// Panics if `size == 0`.
    pub fn stack_size(mut self, size: usize) -> Self {
        assert!(size > 0, "stack_size must be > 0");

        self.config.stack_size = Some(size);
        self
    }

    /// Returns the configuration the scheduler will be built with.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Builds the scheduler and starts its worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Spawn`](crate::SchedulerError::Spawn) if the
    /// operating system refuses to create the thread.
    pub fn build(self) -> Result<ThreadScheduler> {
        let mut builder = thread::Builder::new().name(self.config.thread_name);

        if let Some(size) = self.config.stack_size {
            builder = builder.stack_size(size);
        }

        ThreadScheduler::spawn(builder)
    }
}
