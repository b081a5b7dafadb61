//! Byte-level socket transport over raw POSIX descriptors.
//!
//! A [`Socket`] is a plain handle around one file descriptor. It is never
//! closed implicitly: whoever owns it calls [`Socket::close`] exactly once.

use std::io;
use std::mem;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::unix::io::{AsRawFd, RawFd};
use std::ptr;

use thiserror::Error;


const MODULE: &str = "SOCKET";

const LF: u8 = 10;
const CR: u8 = 13;

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: libc::c_int = 0;


#[derive(Debug, Error)]
pub enum SocketError {
    #[error("socket creation failed: {0}")]
    SocketCreationFailed(#[source] io::Error),
    #[error("setting SO_REUSEADDR failed: {0}")]
    ReuseAddrFailed(#[source] io::Error),
    #[error("bind failed: {0}")]
    BindFailed(#[source] io::Error),
    #[error("listen failed: {0}")]
    ListenFailed(#[source] io::Error),
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] io::Error),
    #[error("recv failed: {0}")]
    RecvFailed(#[source] io::Error),
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),
    #[error("getting socket name failed: {0}")]
    PeerNameFailed(#[source] io::Error),
}


/// Handle to one OS socket. Equality and hashing follow the descriptor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Socket {
    fd: RawFd,
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Socket {
    /// Create an IPv4 stream socket bound to `0.0.0.0:port` and start listening.
    ///
    /// Any descriptor created along the way is released before an error is
    /// returned.
    pub fn listen(port: u16, backlog: i32) -> Result<Socket, SocketError> {
        let fd = cvt(unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0) })
            .map_err(SocketError::SocketCreationFailed)?;
        let socket = Socket { fd };

        if let Err(e) = socket.set_int_option(libc::SOL_SOCKET, libc::SO_REUSEADDR, 1) {
            socket.close();
            return Err(SocketError::ReuseAddrFailed(e));
        }
        socket.set_no_sigpipe();

        let addr = sockaddr_in(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        let bound = cvt(unsafe {
            libc::bind(
                fd,
                &addr as *const libc::sockaddr_in as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        });
        if let Err(e) = bound {
            socket.close();
            return Err(SocketError::BindFailed(e));
        }

        if let Err(e) = cvt(unsafe { libc::listen(fd, backlog) }) {
            socket.close();
            return Err(SocketError::ListenFailed(e));
        }

        debug!("[{}] Listening on 0.0.0.0:{} [fd={}; backlog={}]", MODULE, port, fd, backlog);
        Ok(socket)
    }

    /// Block until a client connects and return the socket bound to it.
    pub fn accept(&self) -> Result<Socket, SocketError> {
        loop {
            match cvt(unsafe { libc::accept(self.fd, ptr::null_mut(), ptr::null_mut()) }) {
                Ok(fd) => {
                    let client = Socket { fd };
                    client.set_no_sigpipe();
                    return Ok(client);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SocketError::AcceptFailed(e)),
            }
        }
    }

    /// Read one line, one byte per `recv`.
    ///
    /// Bytes up to and including CR are dropped, LF terminates the line and is
    /// not part of the result. A closed peer before LF is an error.
    pub fn read_line(&self) -> Result<String, SocketError> {
        let mut line = Vec::new();
        loop {
            let byte = self.read_byte()?;
            if byte == LF {
                break;
            }
            if byte > CR {
                line.push(byte);
            }
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn read_byte(&self) -> Result<u8, SocketError> {
        let mut buf = [0u8; 1];
        loop {
            let n = unsafe { libc::recv(self.fd, buf.as_mut_ptr() as *mut libc::c_void, 1, 0) };
            if n > 0 {
                return Ok(buf[0]);
            }
            if n == 0 {
                return Err(SocketError::RecvFailed(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                )));
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(SocketError::RecvFailed(err));
            }
        }
    }

    /// Send the whole buffer, looping over short writes.
    pub fn write_all(&self, data: &[u8]) -> Result<(), SocketError> {
        let mut sent = 0;
        while sent < data.len() {
            let rest = &data[sent..];
            let n = unsafe {
                libc::send(self.fd, rest.as_ptr() as *const libc::c_void, rest.len(), SEND_FLAGS)
            };
            if n > 0 {
                sent += n as usize;
                continue;
            }
            if n == 0 {
                return Err(SocketError::WriteFailed(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "send wrote zero bytes",
                )));
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(SocketError::WriteFailed(err));
            }
        }
        Ok(())
    }

    /// Shut down both directions without releasing the descriptor.
    pub fn shutdown(&self) {
        // ENOTCONN is expected for peers that already went away.
        unsafe { libc::shutdown(self.fd, libc::SHUT_RDWR) };
    }

    /// Shut down and release the descriptor. Must be called once per socket.
    pub fn close(self) {
        self.shutdown();
        if unsafe { libc::close(self.fd) } == -1 {
            warn!("[{}] close(fd={}) failed: {}", MODULE, self.fd, io::Error::last_os_error());
        }
    }

    /// Numeric IPv4 address of the connected peer.
    pub fn peer_name(&self) -> Result<SocketAddrV4, SocketError> {
        self.name_with(|fd, addr, len| unsafe { libc::getpeername(fd, addr, len) })
    }

    /// Port this socket is bound to, useful after listening on port 0.
    pub fn local_port(&self) -> Result<u16, SocketError> {
        self.name_with(|fd, addr, len| unsafe { libc::getsockname(fd, addr, len) })
            .map(|addr| addr.port())
    }

    fn name_with<F>(&self, call: F) -> Result<SocketAddrV4, SocketError>
    where
        F: FnOnce(RawFd, *mut libc::sockaddr, *mut libc::socklen_t) -> libc::c_int,
    {
        let mut addr: libc::sockaddr_in = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
        cvt(call(self.fd, &mut addr as *mut libc::sockaddr_in as *mut libc::sockaddr, &mut len))
            .map_err(SocketError::PeerNameFailed)?;

        if addr.sin_family as libc::c_int != libc::AF_INET {
            return Err(SocketError::PeerNameFailed(io::Error::new(
                io::ErrorKind::Unsupported,
                "not an IPv4 socket",
            )));
        }
        Ok(SocketAddrV4::new(
            Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr)),
            u16::from_be(addr.sin_port),
        ))
    }

    fn set_int_option(&self, level: libc::c_int, name: libc::c_int, value: libc::c_int) -> io::Result<()> {
        cvt(unsafe {
            libc::setsockopt(
                self.fd,
                level,
                name,
                &value as *const libc::c_int as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        })
        .map(|_| ())
    }

    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    fn set_no_sigpipe(&self) {
        if let Err(e) = self.set_int_option(libc::SOL_SOCKET, libc::SO_NOSIGPIPE, 1) {
            warn!("[{}] Could not set SO_NOSIGPIPE on fd={}: {}", MODULE, self.fd, e);
        }
    }

    // MSG_NOSIGNAL on every send covers this platform.
    #[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "freebsd")))]
    fn set_no_sigpipe(&self) {}
}


fn cvt(rc: libc::c_int) -> io::Result<libc::c_int> {
    if rc == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(rc)
    }
}

fn sockaddr_in(addr: SocketAddrV4) -> libc::sockaddr_in {
    let mut raw: libc::sockaddr_in = unsafe { mem::zeroed() };
    raw.sin_family = libc::AF_INET as libc::sa_family_t;
    raw.sin_port = addr.port().to_be();
    raw.sin_addr = libc::in_addr { s_addr: u32::from(*addr.ip()).to_be() };
    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    {
        raw.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
    }
    raw
}
