mod common;

use sequent::{Scheduler, SchedulerBuilder, SchedulerConfig};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

#[test]
fn test_full_config_from_toml() {
    let config: SchedulerConfig = toml::from_str(
        r#"
            thread_name = "listen-stream"
            stack_size = 262144
        "#,
    )
    .unwrap();

    assert_eq!(config.thread_name, "listen-stream");
    assert_eq!(config.stack_size, Some(262_144));
}

#[test]
fn test_missing_fields_fall_back_to_defaults() {
    let partial: SchedulerConfig = toml::from_str("stack_size = 65536").unwrap();
    assert_eq!(partial.thread_name, SchedulerConfig::default().thread_name);
    assert_eq!(partial.stack_size, Some(65_536));

    let empty: SchedulerConfig = toml::from_str("").unwrap();
    assert_eq!(empty, SchedulerConfig::default());
    assert_eq!(empty.thread_name, "sequent-worker");
    assert_eq!(empty.stack_size, None);
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = toml::from_str::<SchedulerConfig>("stack_size = \"large\"");

    assert!(result.is_err(), "A non-numeric stack size must not parse");
}

#[test]
fn test_builder_from_config() {
    common::init_tracing();
    let config: SchedulerConfig = toml::from_str(r#"thread_name = "online-state""#).unwrap();

    let builder = SchedulerBuilder::from_config(&config);
    assert_eq!(builder.config(), &config);

    let scheduler = builder.build().unwrap();
    let (transmitter, receiver) = mpsc::channel();

    scheduler.execute_now(Box::new(move || {
        let _ = transmitter.send(thread::current().name().map(str::to_owned));
    }));

    let name = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(name.as_deref(), Some("online-state"));
}

#[test]
fn test_builder_overrides_config() {
    let builder = SchedulerBuilder::from_config(&SchedulerConfig::default())
        .thread_name("write-stream")
        .stack_size(128 * 1024);

    assert_eq!(builder.config().thread_name, "write-stream");
    assert_eq!(builder.config().stack_size, Some(128 * 1024));
}
