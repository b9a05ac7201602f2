//! Blocking client for the sigmet-raw daemon.
//!
//! Connection per request: connect, sendmsg the request with the two
//! channel descriptors, read the fixed-shape response from the socket,
//! then drain the bulk channel to end of file. A daemon-reported failure
//! arrives as status Error plus human-readable text on the error channel.

use std::io::Read;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use crate::error::{Result, SigmetError};
use crate::ipc::fdpass::{placeholder_fd, send_with_fds, Pipe};
use crate::ipc::messages::{
    bytes_to_f32_vec, decode_sweep_hdr, Request, Response, SubCmd, WideRayHdr, RESPONSE_WIRE_SIZE,
    SWEEP_HDR_WIRE_SIZE, WIDE_RAY_HDR_WIRE_SIZE,
};
use crate::volume::VolumeHdr;

/// Client for one daemon socket.
#[derive(Debug, Clone)]
pub struct Client {
    socket_path: PathBuf,
}

impl Client {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    fn connect(&self) -> Result<UnixStream> {
        UnixStream::connect(&self.socket_path).map_err(|e| {
            SigmetError::Protocol(format!(
                "could not connect to daemon at {}: {}",
                self.socket_path.display(),
                e
            ))
        })
    }

    /// Issue one request. Returns the response and the full bulk stream.
    /// A status of Error becomes a `Daemon` error carrying the error
    /// channel's text.
    pub fn request(&self, req: &Request) -> Result<(Response, Vec<u8>)> {
        let sock = self.connect()?;
        let err_pipe = Pipe::new()?;
        let bulk_pipe = Pipe::new()?;
        send_with_fds(
            &sock,
            &req.encode(),
            [err_pipe.write.as_raw_fd(), bulk_pipe.write.as_raw_fd()],
        )?;
        // The daemon holds the only other copies of the write ends; drop
        // ours so end of file arrives once it closes them.
        drop(err_pipe.write);
        drop(bulk_pipe.write);

        let resp = read_response(&sock)?;
        drop(sock);

        if !resp.is_okay() {
            let mut msg = String::new();
            let mut err_rd = std::fs::File::from(err_pipe.read);
            err_rd.read_to_string(&mut msg).unwrap_or(0);
            let msg = msg.trim_end().to_string();
            if msg.is_empty() {
                return Err(SigmetError::Daemon("daemon reported an error".to_string()));
            }
            return Err(SigmetError::Daemon(msg));
        }

        let mut bulk = Vec::new();
        let mut bulk_rd = std::fs::File::from(bulk_pipe.read);
        bulk_rd.read_to_end(&mut bulk)?;
        Ok((resp, bulk))
    }

    /// Issue a request whose bulk channel is irrelevant (Exit). A
    /// placeholder descriptor keeps the wire shape constant.
    pub fn request_no_bulk(&self, req: &Request) -> Result<Response> {
        let sock = self.connect()?;
        let err_pipe = Pipe::new()?;
        let bulk_fd = placeholder_fd()?;
        send_with_fds(
            &sock,
            &req.encode(),
            [err_pipe.write.as_raw_fd(), bulk_fd.as_raw_fd()],
        )?;
        drop(err_pipe.write);
        drop(bulk_fd);

        let resp = read_response(&sock)?;
        if !resp.is_okay() {
            let mut msg = String::new();
            let mut err_rd = std::fs::File::from(err_pipe.read);
            err_rd.read_to_string(&mut msg).unwrap_or(0);
            return Err(SigmetError::Daemon(msg.trim_end().to_string()));
        }
        Ok(resp)
    }

    /// Issue a request whose bulk bytes go straight to a caller-supplied
    /// descriptor (e.g. standard output) instead of a pipe owned here.
    pub fn request_to_fd(&self, req: &Request, bulk: std::os::fd::RawFd) -> Result<Response> {
        let sock = self.connect()?;
        let err_pipe = Pipe::new()?;
        send_with_fds(&sock, &req.encode(), [err_pipe.write.as_raw_fd(), bulk])?;
        drop(err_pipe.write);

        let resp = read_response(&sock)?;
        if !resp.is_okay() {
            let mut msg = String::new();
            let mut err_rd = std::fs::File::from(err_pipe.read);
            err_rd.read_to_string(&mut msg).unwrap_or(0);
            return Err(SigmetError::Daemon(msg.trim_end().to_string()));
        }
        Ok(resp)
    }

    /// Fetch the volume headers and rebuild the header value.
    pub fn volume_headers(&self) -> Result<(Response, VolumeHdr)> {
        let (resp, bulk) = self.request(&Request::new(SubCmd::VolumeHeaders))?;
        let hdr = VolumeHdr::decode(&bulk)?;
        Ok((resp, hdr))
    }

    /// Fetch all sweep headers.
    pub fn sweep_headers(&self) -> Result<(Response, Vec<crate::volume::SweepHdr>)> {
        let (resp, bulk) = self.request(&Request::new(SubCmd::SweepHeaders))?;
        let n = bulk.len() / SWEEP_HDR_WIRE_SIZE;
        let mut hdrs = Vec::with_capacity(n);
        for i in 0..n {
            hdrs.push(decode_sweep_hdr(&bulk, i * SWEEP_HDR_WIRE_SIZE)?);
        }
        Ok((resp, hdrs))
    }

    /// Fetch wide ray headers for one sweep or all sweeps.
    pub fn ray_headers(&self, abbrv: &str, sweep: u32) -> Result<(Response, Vec<WideRayHdr>)> {
        let req = Request::new(SubCmd::RayHeaders)
            .with_data_type(abbrv)
            .with_sweep(sweep);
        let (resp, bulk) = self.request(&req)?;
        let n = bulk.len() / WIDE_RAY_HDR_WIRE_SIZE;
        let mut hdrs = Vec::with_capacity(n);
        for i in 0..n {
            hdrs.push(WideRayHdr::decode(&bulk, i * WIDE_RAY_HDR_WIRE_SIZE)?);
        }
        Ok((resp, hdrs))
    }

    /// Fetch one sweep of physical values, rays concatenated in order.
    pub fn data(&self, abbrv: &str, sweep: u32, corrected: bool) -> Result<(Response, Vec<f32>)> {
        let sub_cmd = if corrected { SubCmd::Corrected } else { SubCmd::Data };
        let req = Request::new(sub_cmd).with_data_type(abbrv).with_sweep(sweep);
        let (resp, bulk) = self.request(&req)?;
        let vals = bytes_to_f32_vec(&bulk)?;
        if vals.len() != resp.num_bins_in_sweep as usize {
            return Err(SigmetError::Protocol(format!(
                "daemon announced {} values, sent {}",
                resp.num_bins_in_sweep,
                vals.len()
            )));
        }
        Ok((resp, vals))
    }

    /// Ask the daemon to exit.
    pub fn exit(&self) -> Result<Response> {
        self.request_no_bulk(&Request::new(SubCmd::Exit))
    }
}

fn read_response(sock: &UnixStream) -> Result<Response> {
    let mut sock = sock;
    let mut buf = [0u8; RESPONSE_WIRE_SIZE];
    sock.read_exact(&mut buf).map_err(|e| {
        SigmetError::Protocol(format!("could not read daemon response: {}", e))
    })?;
    Response::decode(&buf)
}
