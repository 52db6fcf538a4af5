//! Blocking protocol client
//!
//! Used by `playctl` and by integration tests. One request is written and
//! its response read before the next request goes out.

use crate::protocol::{Reply, Request, Response, DEFAULT_MAX_PAYLOAD};
use crate::{Error, Result};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

pub struct Client {
    stream: TcpStream,
    max_payload: usize,
}

impl Client {
    /// Connect to a running service
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            max_payload: DEFAULT_MAX_PAYLOAD,
        })
    }

    /// Fail requests that take longer than `timeout` to answer
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        self.stream.set_write_timeout(timeout)?;
        Ok(())
    }

    /// Send one request and wait for its response
    pub fn request(&mut self, request: &Request) -> Result<Response> {
        request.write_to(&mut self.stream)?;
        Response::read_from(&mut self.stream, self.max_payload)
    }

    /// Send raw bytes as a frame; lets tests exercise malformed requests
    pub fn request_raw(&mut self, code: u8, payload: &[u8]) -> Result<Response> {
        crate::protocol::write_frame(&mut self.stream, code, payload)?;
        Response::read_from(&mut self.stream, self.max_payload)
    }

    /// Send a request that must succeed, returning its reply
    pub fn expect_ok(&mut self, request: &Request) -> Result<Reply> {
        let response = self.request(request)?;
        if response.is_ok() {
            return Ok(response.reply);
        }
        let message = match response.reply {
            Reply::Error(message) => message,
            _ => format!("{:?}", response.status),
        };
        Err(Error::Protocol(format!(
            "{:?} refused: {}",
            request.opcode(),
            message
        )))
    }
}
