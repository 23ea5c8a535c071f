// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport: requests go straight to a [`RequestDispatcher`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Connection, Connector};
use crate::adapter::RequestDispatcher;
use crate::config::DEFAULT_MAX_MESSAGE_SIZE;
use crate::exception::{minor, CompletionStatus, SystemException};
use crate::giop::{control_message, parse_message, Message, MessageType, Version};
use crate::ior::Endpoint;

/// Connector resolving endpoints to dispatchers registered in this process.
#[derive(Default, Clone)]
pub struct LoopbackConnector {
    routes: Arc<RwLock<HashMap<Endpoint, Arc<RequestDispatcher>>>>,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route connections to `endpoint` to `dispatcher`.
    pub fn register(&self, endpoint: Endpoint, dispatcher: Arc<RequestDispatcher>) {
        self.routes.write().insert(endpoint, dispatcher);
    }

    pub fn unregister(&self, endpoint: &Endpoint) {
        self.routes.write().remove(endpoint);
    }
}

impl Connector for LoopbackConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, SystemException> {
        if !self.routes.read().contains_key(endpoint) {
            return Err(SystemException::transient(
                minor::NO_ROUTE,
                format!("no loopback route to {}", endpoint),
            ));
        }
        Ok(Box::new(LoopbackConnection {
            endpoint: endpoint.clone(),
            routes: Arc::clone(&self.routes),
            pending: VecDeque::new(),
        }))
    }
}

struct LoopbackConnection {
    endpoint: Endpoint,
    routes: Arc<RwLock<HashMap<Endpoint, Arc<RequestDispatcher>>>>,
    pending: VecDeque<Vec<u8>>,
}

impl Connection for LoopbackConnection {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn send(&mut self, message: &[u8]) -> Result<(), SystemException> {
        let dispatcher = self.routes.read().get(&self.endpoint).cloned().ok_or_else(|| {
            SystemException::comm_failure(
                minor::SEND,
                format!("loopback route to {} removed", self.endpoint),
            )
        })?;
        let message = parse_message(message, DEFAULT_MAX_MESSAGE_SIZE)?;
        let outcome = dispatcher.handle(message);
        if let Some(reply) = outcome.reply {
            self.pending.push_back(reply);
        }
        if outcome.close {
            self.pending
                .push_back(control_message(Version::V1_0, MessageType::CloseConnection));
        }
        Ok(())
    }

    fn receive(&mut self) -> Result<Message, SystemException> {
        let bytes = self.pending.pop_front().ok_or_else(|| {
            SystemException::comm_failure(minor::CONNECTION_CLOSED, "no pending loopback reply")
                .with_completed(CompletionStatus::Maybe)
        })?;
        parse_message(&bytes, DEFAULT_MAX_MESSAGE_SIZE)
    }
}
