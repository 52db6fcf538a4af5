//! Command server
//!
//! Accepts one UI connection at a time and serves its requests in order,
//! each response written before the next request is read. A malformed or
//! oversized request is answered with a protocol error and the connection
//! stays open. Both the accept loop and client reads poll the exit flag, so
//! the thread returns promptly on shutdown.

use super::command;
use super::MainService;
use crate::error::{Error, Result};
use playd_common::protocol::{read_frame, Frame, Request, Response};
use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const ACCEPT_POLL: Duration = Duration::from_millis(50);
const READ_POLL: Duration = Duration::from_millis(200);

pub struct CommandServer {
    listener: TcpListener,
    max_payload: usize,
}

impl CommandServer {
    /// Bind the listening socket
    pub fn bind(addr: &str, max_payload: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;
        listener.set_nonblocking(true)?;
        info!("Command server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            max_payload,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve clients until exit is requested
    pub fn run(self, service: Arc<MainService>) {
        info!("Command thread started");
        while !service.exit_requested() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    info!("Client connected: {}", peer);
                    match self.serve(&service, stream) {
                        Ok(()) => info!("Client disconnected: {}", peer),
                        Err(e) => warn!("Client {} dropped: {}", peer, e),
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    warn!("Accept error: {}", e);
                    std::thread::sleep(ACCEPT_POLL);
                }
            }
        }
        info!("Command thread stopped");
    }

    fn serve(&self, service: &MainService, stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(READ_POLL))?;

        let mut reader = PatientReader {
            stream: &stream,
            service,
        };
        let mut writer = &stream;

        loop {
            let frame = match read_frame(&mut reader, self.max_payload) {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(()),
                Err(playd_common::Error::Io(e)) if e.kind() == io::ErrorKind::ConnectionAborted => {
                    debug!("Closing client connection for exit");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            let response = match frame {
                Frame::Oversized { code, len } => {
                    warn!("Request {} payload of {} bytes exceeds limit", code, len);
                    Response::protocol_error(format!(
                        "payload of {} bytes exceeds the {} byte limit",
                        len, self.max_payload
                    ))
                }
                Frame::Complete { code, payload } => match Request::decode(code, &payload) {
                    Ok(request) => command::handle(service, request),
                    Err(e) => {
                        warn!("Bad request {}: {}", code, e);
                        Response::protocol_error(e.to_string())
                    }
                },
            };

            response.write_to(&mut writer)?;

            if service.exit_requested() {
                return Ok(());
            }
        }
    }
}

/// Blocking reader that rides out read timeouts until exit is requested
struct PatientReader<'a> {
    stream: &'a TcpStream,
    service: &'a MainService,
}

impl Read for PatientReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.stream.read(buf) {
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    if self.service.exit_requested() {
                        return Err(io::Error::new(
                            io::ErrorKind::ConnectionAborted,
                            "service exiting",
                        ));
                    }
                }
                other => return other,
            }
        }
    }
}
