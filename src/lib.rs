//! sizewatch
//!
//! Periodically scans a directory tree, records each file's size, and
//! reports files whose size changed since the previous scan.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod monitor;
pub mod notify;
pub mod scanner;
pub mod server;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
