//! Daemon core - socket lifecycle, request handling, shutdown
//!
//! The daemon decodes one volume at startup and serves it to short-lived
//! clients over a Unix stream socket, one connection per request. The
//! volume is immutable and shared read-only, so request handling needs no
//! locking. All per-request I/O is blocking and runs on short-lived
//! blocking tasks.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use crate::error::{Result, SigmetError};
use crate::ipc::fdpass::recv_with_fds;
use crate::ipc::messages::{Request, Response, REQUEST_NUM_FDS, REQUEST_WIRE_SIZE};
use crate::volume::Volume;

pub mod handlers;

pub use handlers::{serve, Served};

/// Get the default data directory (~/.sigmet_raw/)
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sigmet_raw")
}

/// Get the default socket path (~/.sigmet_raw/daemon.sock)
pub fn default_socket_path() -> PathBuf {
    default_data_dir().join("daemon.sock")
}

/// Pid file path belonging to a socket path.
pub fn pid_path_for(socket_path: &Path) -> PathBuf {
    socket_path.with_extension("pid")
}

/// Configuration for the daemon
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Path to the Unix socket
    pub socket_path: PathBuf,
    /// Path to the PID file
    pub pid_path: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let socket_path = default_socket_path();
        let pid_path = pid_path_for(&socket_path);
        Self { socket_path, pid_path }
    }
}

impl DaemonConfig {
    /// Create config for an explicit socket path.
    pub fn with_socket_path(path: impl Into<PathBuf>) -> Self {
        let socket_path = path.into();
        let pid_path = pid_path_for(&socket_path);
        Self { socket_path, pid_path }
    }
}

/// The daemon: one decoded volume plus the socket it is served on.
pub struct Daemon {
    config: DaemonConfig,
    volume: Arc<Volume>,
}

impl Daemon {
    pub fn new(config: DaemonConfig, volume: Volume) -> Self {
        Self {
            config,
            volume: Arc::new(volume),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Check if a daemon is already running by checking the PID file
    pub fn is_running(pid_path: &Path) -> bool {
        if let Some(pid) = Self::get_pid(pid_path) {
            unsafe { libc::kill(pid, 0) == 0 }
        } else {
            false
        }
    }

    /// Get the PID from the PID file if it exists
    pub fn get_pid(pid_path: &Path) -> Option<i32> {
        if !pid_path.exists() {
            return None;
        }
        let mut contents = String::new();
        fs::File::open(pid_path).ok()?.read_to_string(&mut contents).ok()?;
        contents.trim().parse().ok()
    }

    fn write_pid(&self) -> Result<()> {
        if let Some(parent) = self.config.pid_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(&self.config.pid_path)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(())
    }

    fn remove_pid(&self) {
        let _ = fs::remove_file(&self.config.pid_path);
    }

    /// Run the daemon until an Exit request or a termination signal.
    pub async fn run(&mut self) -> Result<()> {
        if Self::is_running(&self.config.pid_path) {
            return Err(SigmetError::Protocol(
                "daemon is already running".to_string(),
            ));
        }
        self.write_pid()?;
        info!("daemon started with PID {}", std::process::id());

        if self.config.socket_path.exists() {
            fs::remove_file(&self.config.socket_path)?;
        }
        if let Some(parent) = self.config.socket_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let listener = tokio::net::UnixListener::bind(&self.config.socket_path)
            .map_err(|e| SigmetError::Protocol(format!("failed to bind socket: {}", e)))?;
        info!("daemon listening on {}", self.config.socket_path.display());

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| SigmetError::Protocol(format!("failed to register SIGTERM handler: {}", e)))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| SigmetError::Protocol(format!("failed to register SIGINT handler: {}", e)))?;

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _addr)) => {
                            let std_stream = match stream.into_std() {
                                Ok(s) => s,
                                Err(e) => {
                                    warn!("could not unwrap accepted connection: {}", e);
                                    continue;
                                }
                            };
                            let volume = Arc::clone(&self.volume);
                            let shutdown = shutdown_tx.clone();
                            tokio::task::spawn_blocking(move || {
                                if std_stream.set_nonblocking(false).is_err() {
                                    return;
                                }
                                match handle_connection(&std_stream, &volume) {
                                    Ok(true) => {
                                        let _ = shutdown.blocking_send(());
                                    }
                                    Ok(false) => {}
                                    Err(e) => warn!("request failed: {}", e),
                                }
                            });
                        }
                        Err(e) => {
                            warn!("accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("exit requested by client");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                    break;
                }
                _ = sigint.recv() => {
                    info!("received SIGINT, shutting down");
                    break;
                }
            }
        }

        let _ = fs::remove_file(&self.config.socket_path);
        self.remove_pid();
        info!("daemon stopped");
        Ok(())
    }

    /// Stop a running daemon by sending SIGTERM
    pub fn stop(pid_path: &Path) -> Result<bool> {
        if let Some(pid) = Self::get_pid(pid_path) {
            info!("sending SIGTERM to daemon (PID {})", pid);
            let result = unsafe { libc::kill(pid, libc::SIGTERM) };
            if result != 0 {
                return Err(SigmetError::Protocol(format!(
                    "failed to send SIGTERM to PID {}",
                    pid
                )));
            }
            for _ in 0..30 {
                std::thread::sleep(std::time::Duration::from_millis(100));
                if unsafe { libc::kill(pid, 0) } != 0 {
                    let _ = fs::remove_file(pid_path);
                    return Ok(true);
                }
            }
            info!("daemon did not stop, sending SIGKILL");
            let result = unsafe { libc::kill(pid, libc::SIGKILL) };
            if result != 0 {
                return Err(SigmetError::Protocol(format!(
                    "failed to send SIGKILL to PID {}",
                    pid
                )));
            }
            let _ = fs::remove_file(pid_path);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Handle one accepted connection: receive the request and its two
/// descriptors, send the response on the socket, then write the artifact
/// to the bulk channel or the failure text to the error channel. Returns
/// true when the client asked the daemon to exit.
///
/// Received descriptors are dropped on every path out of this function; a
/// broken pipe on the bulk channel is logged and never fatal.
fn handle_connection(stream: &std::os::unix::net::UnixStream, volume: &Volume) -> Result<bool> {
    let mut buf = [0u8; REQUEST_WIRE_SIZE];
    let (n, mut fds) = recv_with_fds(stream, &mut buf)?;
    if n != REQUEST_WIRE_SIZE {
        return Err(SigmetError::Protocol(format!(
            "request is {} bytes, expected {}",
            n, REQUEST_WIRE_SIZE
        )));
    }
    if fds.len() != REQUEST_NUM_FDS {
        return Err(SigmetError::Protocol(format!(
            "request carried {} descriptors, expected {}",
            fds.len(),
            REQUEST_NUM_FDS
        )));
    }
    let (bulk_fd, err_fd) = match (fds.pop(), fds.pop()) {
        (Some(bulk), Some(err)) => (bulk, err),
        _ => {
            return Err(SigmetError::Protocol(
                "request descriptors missing".to_string(),
            ))
        }
    };

    let req = match Request::decode(&buf) {
        Ok(req) => req,
        Err(e) => {
            let resp = Response::error(volume.headers.tz_field());
            send_response(stream, &resp)?;
            write_error_text(err_fd, &e.to_string());
            return Ok(false);
        }
    };
    info!(
        "request: {:?} type \"{}\" sweep {}",
        req.sub_cmd, req.abbrv, req.sweep
    );

    match serve(volume, &req) {
        Ok(Served::ExitRequested { resp }) => {
            send_response(stream, &resp)?;
            Ok(true)
        }
        Ok(Served::Artifact { resp, bulk }) => {
            // The metadata reply always precedes the first bulk byte.
            send_response(stream, &resp)?;
            let mut bulk_wr = std::fs::File::from(bulk_fd);
            if let Err(e) = bulk_wr.write_all(&bulk) {
                if e.kind() == std::io::ErrorKind::BrokenPipe {
                    warn!("client closed the bulk channel early");
                    write_error_text(err_fd, "bulk channel closed before transfer finished");
                } else {
                    warn!("bulk write failed: {}", e);
                    write_error_text(err_fd, &format!("bulk write failed: {}", e));
                }
            }
            Ok(false)
        }
        Err((resp, msg)) => {
            send_response(stream, &resp)?;
            write_error_text(err_fd, &msg);
            Ok(false)
        }
    }
}

fn send_response(stream: &std::os::unix::net::UnixStream, resp: &Response) -> Result<()> {
    let mut stream = stream;
    stream.write_all(&resp.encode())?;
    Ok(())
}

fn write_error_text(err_fd: std::os::fd::OwnedFd, msg: &str) {
    let mut wr = std::fs::File::from(err_fd);
    if let Err(e) = wr.write_all(msg.as_bytes()) {
        warn!("could not write to the client error channel: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_paths() {
        let dir = default_data_dir();
        assert!(dir.ends_with(".sigmet_raw"));
        assert!(default_socket_path().ends_with("daemon.sock"));
    }

    #[test]
    fn test_pid_path_for_socket() {
        let p = pid_path_for(Path::new("/tmp/vol.sock"));
        assert_eq!(p, PathBuf::from("/tmp/vol.pid"));
    }

    #[test]
    fn test_daemon_config_with_socket_path() {
        let config = DaemonConfig::with_socket_path("/tmp/vol.sock");
        assert_eq!(config.socket_path, PathBuf::from("/tmp/vol.sock"));
        assert_eq!(config.pid_path, PathBuf::from("/tmp/vol.pid"));
    }

    #[test]
    fn test_get_pid_no_file() {
        let dir = tempdir().unwrap();
        assert!(Daemon::get_pid(&dir.path().join("none.pid")).is_none());
    }

    #[test]
    fn test_get_pid_with_file() {
        let dir = tempdir().unwrap();
        let pid_path = dir.path().join("test.pid");
        fs::write(&pid_path, "12345\n").unwrap();
        assert_eq!(Daemon::get_pid(&pid_path), Some(12345));
    }

    #[test]
    fn test_get_pid_invalid_content() {
        let dir = tempdir().unwrap();
        let pid_path = dir.path().join("test.pid");
        fs::write(&pid_path, "not-a-number\n").unwrap();
        assert!(Daemon::get_pid(&pid_path).is_none());
    }

    #[test]
    fn test_is_running_no_pid_file() {
        let dir = tempdir().unwrap();
        assert!(!Daemon::is_running(&dir.path().join("none.pid")));
    }

    #[test]
    fn test_stop_without_daemon() {
        let dir = tempdir().unwrap();
        assert!(!Daemon::stop(&dir.path().join("none.pid")).unwrap());
    }
}
