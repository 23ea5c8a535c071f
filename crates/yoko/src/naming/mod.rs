// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CosNaming: name types, client stubs and a transient name service.
//!
//! # Example
//!
//! ```rust,no_run
//! use yoko::naming::{NameServiceConfig, NamingContextStub, TransientNameService};
//!
//! let service = TransientNameService::new(NameServiceConfig::default());
//! let root = service.initialize()?;
//! let orb = service.orb().expect("initialized");
//!
//! let ctx = NamingContextStub::new(&orb, root);
//! let name = ctx.to_name("printers.dir/laser")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod names;
mod servant;
mod service;
mod stub;
mod types;

pub use servant::{TransientBindingIterator, TransientNamingContext};
pub use service::{NameServiceConfig, TransientNameService};
pub use stub::{BindingIteratorStub, NamingContextStub};
pub use types::{
    AlreadyBound, Binding, BindingType, CannotProceed, InvalidAddress, InvalidName, Name,
    NameComponent, NamingError, NotEmpty, NotFound, NotFoundReason,
};

pub const NAMING_CONTEXT_ID: &str = "IDL:omg.org/CosNaming/NamingContext:1.0";
pub const NAMING_CONTEXT_EXT_ID: &str = "IDL:omg.org/CosNaming/NamingContextExt:1.0";
pub const BINDING_ITERATOR_ID: &str = "IDL:omg.org/CosNaming/BindingIterator:1.0";

#[cfg(test)]
mod tests;
