// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IIOP over TCP.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{Connection, Connector};
use crate::exception::{minor, SystemException};
use crate::giop::{read_message, Message};
use crate::ior::Endpoint;

/// Opens blocking TCP connections.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    pub connect_timeout: Duration,
    pub read_timeout: Option<Duration>,
    pub max_message_size: usize,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration, read_timeout: Option<Duration>, max_message_size: usize) -> Self {
        Self {
            connect_timeout,
            read_timeout,
            max_message_size,
        }
    }
}

impl Connector for TcpConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, SystemException> {
        let addrs = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|e| {
                SystemException::transient(
                    minor::CONNECT,
                    format!("cannot resolve {}: {}", endpoint, e),
                )
            })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    log::debug!("[transport] connected to {} ({})", endpoint, addr);
                    return Ok(Box::new(TcpConnection::new(
                        stream,
                        endpoint.clone(),
                        self.read_timeout,
                        self.max_message_size,
                    )?));
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(SystemException::transient(
            minor::CONNECT,
            match last_error {
                Some(e) => format!("connect to {} failed: {}", endpoint, e),
                None => format!("no addresses for {}", endpoint),
            },
        ))
    }
}

/// One client TCP connection.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    endpoint: Endpoint,
    max_message_size: usize,
}

impl TcpConnection {
    pub fn new(
        stream: TcpStream,
        endpoint: Endpoint,
        read_timeout: Option<Duration>,
        max_message_size: usize,
    ) -> Result<Self, SystemException> {
        let setup = |e: std::io::Error| {
            SystemException::transient(minor::CONNECT, format!("socket setup failed: {}", e))
        };
        stream.set_nodelay(true).map_err(setup)?;
        stream.set_read_timeout(read_timeout).map_err(setup)?;
        socket2::SockRef::from(&stream)
            .set_keepalive(true)
            .map_err(setup)?;
        Ok(Self {
            stream,
            endpoint,
            max_message_size,
        })
    }
}

impl Connection for TcpConnection {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn send(&mut self, message: &[u8]) -> Result<(), SystemException> {
        self.stream.write_all(message).map_err(|e| {
            SystemException::comm_failure(minor::SEND, format!("send to {} failed: {}", self.endpoint, e))
        })
    }

    fn receive(&mut self) -> Result<Message, SystemException> {
        read_message(&mut self.stream, self.max_message_size)
    }
}

impl Drop for TcpConnection {
    fn drop(&mut self) {
        log::trace!("[transport] closing connection to {}", self.endpoint);
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}
