// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Yoko - CORBA marshalling, stub dispatch and naming
//!
//! A pure Rust implementation of the CORBA client/server plumbing needed to
//! talk GIOP/IIOP: CDR streams, TypeCodes, `Any`, per-type Helpers, Holders,
//! stub invocation with transparent remarshal, a blocking object adapter and
//! a transient CosNaming service.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use yoko::naming::{NameComponent, NamingContextStub};
//! use yoko::{Orb, OrbConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orb = Orb::init(OrbConfig::default())?;
//!     let obj = orb.string_to_object("corbaloc::localhost:2809/NameService")?;
//!     let root = NamingContextStub::new(&orb, obj);
//!
//!     let name = vec![NameComponent::new("printers", "")];
//!     let ctx = root.bind_new_context(&name)?;
//!     println!("{}", orb.object_to_string(&ctx)?);
//!     Ok(())
//! }
//! ```
//!
//! ## IDL types
//!
//! Types are mapped to Rust structs and enums and marshalled through
//! `#[derive(Idl)]`:
//!
//! ```rust
//! use yoko::Idl;
//!
//! #[derive(Debug, Clone, PartialEq, Idl)]
//! #[idl(id = "IDL:example/Point:1.0")]
//! pub struct Point {
//!     pub x: i32,
//!     pub y: i32,
//! }
//! ```

#![deny(unsafe_code)]

// Allow derive-generated `::yoko::` paths inside this crate
extern crate self as yoko;

/// Any container and generic values
pub mod any;
/// CDR input/output streams
pub mod cdr;
/// ORB configuration and protocol constants
pub mod config;
/// System exceptions and minor codes
pub mod exception;
/// GIOP message framing
pub mod giop;
/// Marshalling helpers
pub mod helper;
/// Out/inout parameter holders
pub mod holder;
/// Interoperable object references
pub mod ior;
/// CosNaming service
pub mod naming;
/// ORB core
pub mod orb;
/// Policy objects
pub mod policy;
/// Server-side object adapter
pub mod adapter;
/// Client-side stubs and delegates
pub mod stub;
/// CosTransactions sample interface
pub mod transactions;
/// Blocking connection transports
pub mod transport;
/// TypeCodes and the TypeCode registry
pub mod typecode;

pub use adapter::{BootManager, ObjectAdapter, ResponseHandler, Servant};
pub use any::{Any, Value};
pub use cdr::{ByteOrder, InputStream, OutputStream};
pub use config::OrbConfig;
pub use exception::{CompletionStatus, SystemException, SystemExceptionKind};
pub use helper::{Helper, UserException};
pub use holder::Holder;
pub use ior::{Endpoint, Ior, ObjectRef};
pub use orb::Orb;
pub use policy::{Policy, PolicyType};
pub use stub::{CallError, Delegate, ExceptionList, ObjectStub};
pub use typecode::{StructMember, TcKind, TypeCode, TypeCodeRegistry};
pub use yoko_codegen::Idl; // Derive macro (for #[derive(yoko::Idl)])
