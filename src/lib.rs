#![doc = include_str!("../README.md")]

mod error;

pub mod channel;
pub mod config;
pub mod framing;
pub mod reading;
pub mod registry;
pub mod session;

pub use error::{Error, Result};
