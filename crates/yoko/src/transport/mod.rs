// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Blocking client transports.
//!
//! A [`Connector`] opens [`Connection`]s to endpoints; the
//! [`ConnectionPool`] keeps idle ones per endpoint and hands them out as
//! [`ConnectionGuard`]s. A call owns its connection exclusively from send to
//! reply, so replies never need demultiplexing.

mod loopback;
mod pool;
mod tcp;

pub use loopback::LoopbackConnector;
pub use pool::{ConnectionGuard, ConnectionPool};
pub use tcp::{TcpConnection, TcpConnector};

use crate::exception::SystemException;
use crate::giop::Message;
use crate::ior::Endpoint;

/// A bidirectional GIOP message channel.
pub trait Connection: Send {
    fn endpoint(&self) -> &Endpoint;

    /// Send one complete framed message.
    fn send(&mut self, message: &[u8]) -> Result<(), SystemException>;

    /// Block until the next complete message arrives.
    fn receive(&mut self) -> Result<Message, SystemException>;
}

/// Factory of connections.
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, SystemException>;
}
