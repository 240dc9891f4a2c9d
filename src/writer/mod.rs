//! Single-active-write buffering for stream transports.
//!
//! Many stream transports forbid starting a write while another one is
//! still in flight. [`BufferedWriter`] sits in front of such a
//! [`Transport`], hands it one payload at a time and buffers the rest in
//! submission order.

mod buffered;

pub use buffered::{BufferedWriter, Transport, WriteHandle, WriterState};
