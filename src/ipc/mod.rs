//! IPC layer - request/response protocol between daemon and clients
//!
//! This module provides:
//! - Fixed-shape wire messages for requests and responses
//! - SCM_RIGHTS descriptor passing over the daemon socket
//! - A blocking connection-per-request client

pub mod client;
pub mod fdpass;
pub mod messages;

pub use client::Client;
pub use messages::{Request, Response, Status, SubCmd, WideRayHdr, ALL_SWEEPS};
