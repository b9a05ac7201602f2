//! sigmet-raw - read Sigmet/IRIS raw product volumes
//!
//! Decodes the record-structured, run-length-encoded raw product format
//! into a strongly typed `Volume`, and serves decoded volumes to
//! short-lived client processes from a daemon over a Unix stream socket,
//! passing the bulk and error channels as file descriptors.

pub mod bits;
pub mod cli;
pub mod daemon;
pub mod error;
pub mod ipc;
pub mod tm;
pub mod types;
pub mod volume;

#[doc(hidden)]
pub mod testgen;

pub use error::{Result, SigmetError};
pub use volume::{DecoderConfig, Volume, VolumeHdr};
