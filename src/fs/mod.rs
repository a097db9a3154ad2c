//! Filesystem utilities for specloop.
//!
//! The progress file is the only durable state the runner owns, so every
//! write to it goes through [`atomic_write_file`].

pub mod atomic;

pub use atomic::atomic_write_file;
