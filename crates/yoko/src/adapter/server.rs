// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IIOP server: accept loop and one blocking thread per connection.

use std::collections::HashMap;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::RequestDispatcher;
use crate::exception::{minor, SystemException, SystemExceptionKind};
use crate::giop::{control_message, read_message, MessageType, Version};

type ConnectionRegistry = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// Listening IIOP endpoint.
pub struct OrbServer {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    connections: ConnectionRegistry,
    accept_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl OrbServer {
    /// Bind `host:port` (port 0 picks a free port) and start accepting.
    pub fn bind(
        host: &str,
        port: u16,
        dispatcher: Arc<RequestDispatcher>,
        max_message_size: usize,
    ) -> Result<Self, SystemException> {
        let listener = create_tcp_listener(host, port).map_err(|e| {
            SystemException::initialize(
                minor::NOT_LISTENING,
                format!("cannot listen on {}:{}: {}", host, port, e),
            )
        })?;
        let local_addr = listener.local_addr().map_err(|e| {
            SystemException::initialize(minor::NOT_LISTENING, format!("local_addr: {}", e))
        })?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let connections: ConnectionRegistry = Arc::new(Mutex::new(HashMap::new()));

        let accept_thread = {
            let shutdown = Arc::clone(&shutdown);
            let connections = Arc::clone(&connections);
            thread::Builder::new()
                .name("yoko-accept".into())
                .spawn(move || {
                    accept_loop(listener, shutdown, connections, dispatcher, max_message_size)
                })
                .map_err(|e| {
                    SystemException::initialize(
                        minor::NOT_LISTENING,
                        format!("cannot spawn accept thread: {}", e),
                    )
                })?
        };

        log::info!("[server] listening on {}", local_addr);
        Ok(Self {
            local_addr,
            shutdown,
            connections,
            accept_thread: Mutex::new(Some(accept_thread)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
    }

    /// Number of open client connections.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Stop accepting, send CloseConnection on every open connection and
    /// close it. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        let close = control_message(Version::V1_0, MessageType::CloseConnection);
        for (_, mut stream) in self.connections.lock().drain() {
            let _ = stream.write_all(&close);
            let _ = stream.shutdown(Shutdown::Both);
        }
        if let Some(handle) = self.accept_thread.lock().take() {
            let _ = handle.join();
        }
        log::info!("[server] {} stopped", self.local_addr);
    }
}

impl Drop for OrbServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn create_tcp_listener(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let addr = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("no address for {}", host),
        )
    })?;

    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let listener: TcpListener = socket.into();
    listener.set_nonblocking(true)?;
    Ok(listener)
}

fn accept_loop(
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    connections: ConnectionRegistry,
    dispatcher: Arc<RequestDispatcher>,
    max_message_size: usize,
) {
    let next_id = AtomicU64::new(0);
    loop {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        match listener.accept() {
            Ok((stream, peer)) => {
                let _ = stream.set_nonblocking(false);
                let _ = stream.set_nodelay(true);

                let id = next_id.fetch_add(1, Ordering::Relaxed);
                match stream.try_clone() {
                    Ok(clone) => {
                        connections.lock().insert(id, clone);
                    }
                    Err(e) => {
                        log::warn!("[server] cannot track connection from {}: {}", peer, e);
                        continue;
                    }
                }
                log::debug!("[server] accepted connection from {}", peer);

                let connections = Arc::clone(&connections);
                let dispatcher = Arc::clone(&dispatcher);
                let spawned = thread::Builder::new()
                    .name(format!("yoko-conn-{}", id))
                    .spawn(move || {
                        handle_connection(stream, &dispatcher, max_message_size);
                        connections.lock().remove(&id);
                        log::debug!("[server] connection from {} closed", peer);
                    });
                if let Err(e) = spawned {
                    log::error!("[server] cannot spawn connection thread: {}", e);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                log::debug!("[server] accept failed: {}", e);
            }
        }
    }
}

fn handle_connection(mut stream: TcpStream, dispatcher: &RequestDispatcher, max_message_size: usize) {
    loop {
        let message = match read_message(&mut stream, max_message_size) {
            Ok(message) => message,
            Err(e) if e.minor == minor::CONNECTION_CLOSED => break,
            Err(e) if e.kind == SystemExceptionKind::CommFailure && e.minor == minor::RECV => {
                log::debug!("[server] read failed: {}", e);
                break;
            }
            Err(e) => {
                // Undecodable header or oversized body
                log::warn!("[server] rejecting message: {}", e);
                let _ = stream.write_all(&control_message(Version::V1_0, MessageType::MessageError));
                break;
            }
        };

        let outcome = dispatcher.handle(message);
        if let Some(reply) = outcome.reply {
            if let Err(e) = stream.write_all(&reply) {
                log::debug!("[server] reply write failed: {}", e);
                break;
            }
        }
        if outcome.close {
            break;
        }
    }
    let _ = stream.shutdown(Shutdown::Both);
}
