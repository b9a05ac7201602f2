//! SCM_RIGHTS file-descriptor passing over a Unix stream socket.
//!
//! A request travels as one sendmsg whose ancillary data carries exactly
//! two descriptors. Received descriptors are owned handles released on
//! every exit path. These wrappers are the only place that touches raw
//! msghdr/cmsghdr plumbing.

use std::fs::File;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use crate::error::{Result, SigmetError};
use crate::ipc::messages::REQUEST_NUM_FDS;

/// Control buffer large enough for one cmsghdr carrying two descriptors.
const CMSG_BUF_LEN: usize = 64;

/// Send `data` with `fds` attached as one SCM_RIGHTS control message.
pub fn send_with_fds(sock: &UnixStream, data: &[u8], fds: [RawFd; REQUEST_NUM_FDS]) -> Result<()> {
    let iov = libc::iovec {
        iov_base: data.as_ptr() as *mut libc::c_void,
        iov_len: data.len(),
    };
    let mut cmsg_buf = [0u8; CMSG_BUF_LEN];
    let fd_bytes = mem::size_of::<[RawFd; REQUEST_NUM_FDS]>();

    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_iov = &iov as *const libc::iovec as *mut libc::iovec;
    msg.msg_iovlen = 1;
    msg.msg_control = cmsg_buf.as_mut_ptr() as *mut libc::c_void;
    msg.msg_controllen = unsafe { libc::CMSG_SPACE(fd_bytes as u32) } as _;

    unsafe {
        let cmsg = libc::CMSG_FIRSTHDR(&msg);
        if cmsg.is_null() {
            return Err(SigmetError::Protocol(
                "no room for the request control message".to_string(),
            ));
        }
        (*cmsg).cmsg_level = libc::SOL_SOCKET;
        (*cmsg).cmsg_type = libc::SCM_RIGHTS;
        (*cmsg).cmsg_len = libc::CMSG_LEN(fd_bytes as u32) as _;
        std::ptr::copy_nonoverlapping(
            fds.as_ptr() as *const u8,
            libc::CMSG_DATA(cmsg),
            fd_bytes,
        );
    }

    let n = unsafe { libc::sendmsg(sock.as_raw_fd(), &msg, 0) };
    if n < 0 {
        return Err(SigmetError::Io(io::Error::last_os_error()));
    }
    if (n as usize) < data.len() {
        return Err(SigmetError::Protocol(format!(
            "request truncated to {} of {} bytes",
            n,
            data.len()
        )));
    }
    Ok(())
}

/// Receive one message into `buf`, collecting any passed descriptors as
/// owned handles. Returns the number of regular bytes read.
pub fn recv_with_fds(sock: &UnixStream, buf: &mut [u8]) -> Result<(usize, Vec<OwnedFd>)> {
    let iov = libc::iovec {
        iov_base: buf.as_mut_ptr() as *mut libc::c_void,
        iov_len: buf.len(),
    };
    let mut cmsg_buf = [0u8; CMSG_BUF_LEN];

    let mut msg: libc::msghdr = unsafe { mem::zeroed() };
    msg.msg_iov = &iov as *const libc::iovec as *mut libc::iovec;
    msg.msg_iovlen = 1;
    msg.msg_control = cmsg_buf.as_mut_ptr() as *mut libc::c_void;
    msg.msg_controllen = cmsg_buf.len() as _;

    let n = unsafe { libc::recvmsg(sock.as_raw_fd(), &mut msg, libc::MSG_CMSG_CLOEXEC) };
    if n < 0 {
        return Err(SigmetError::Io(io::Error::last_os_error()));
    }

    let mut fds = Vec::new();
    unsafe {
        let mut cmsg = libc::CMSG_FIRSTHDR(&msg);
        while !cmsg.is_null() {
            if (*cmsg).cmsg_level == libc::SOL_SOCKET && (*cmsg).cmsg_type == libc::SCM_RIGHTS {
                let data_len = (*cmsg).cmsg_len as usize - libc::CMSG_LEN(0) as usize;
                let count = data_len / mem::size_of::<RawFd>();
                let data = libc::CMSG_DATA(cmsg) as *const RawFd;
                for i in 0..count {
                    let fd = std::ptr::read_unaligned(data.add(i));
                    fds.push(OwnedFd::from_raw_fd(fd));
                }
            }
            cmsg = libc::CMSG_NXTHDR(&msg, cmsg);
        }
    }

    if msg.msg_flags & libc::MSG_CTRUNC != 0 {
        // Any descriptors collected so far are dropped (and closed) here.
        return Err(SigmetError::Protocol(
            "control data truncated on receive".to_string(),
        ));
    }
    Ok((n as usize, fds))
}

/// An anonymous pipe; both ends close on drop.
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

impl Pipe {
    pub fn new() -> Result<Pipe> {
        let mut fds = [0 as RawFd; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EMFILE) || err.raw_os_error() == Some(libc::ENFILE) {
                return Err(SigmetError::ResourceExhausted(err.to_string()));
            }
            return Err(SigmetError::Io(err));
        }
        unsafe {
            Ok(Pipe {
                read: OwnedFd::from_raw_fd(fds[0]),
                write: OwnedFd::from_raw_fd(fds[1]),
            })
        }
    }

    /// Consume the read end as a File for buffered reading.
    pub fn into_reader(self) -> File {
        File::from(self.read)
    }
}

/// Placeholder descriptor for request slots the client does not need, so
/// the wire shape stays constant.
pub fn placeholder_fd() -> Result<OwnedFd> {
    let f = File::open("/dev/null")?;
    Ok(OwnedFd::from(f))
}
