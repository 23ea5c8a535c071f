// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client proxies for `NamingContextExt` and `BindingIterator`.

use super::types::{raises, Binding, Name, NamingError};
use super::{NAMING_CONTEXT_EXT_ID, NAMING_CONTEXT_ID};
use crate::cdr::OutputStream;
use crate::exception::{minor, SystemException};
use crate::helper::Helper;
use crate::holder::Holder;
use crate::ior::ObjectRef;
use crate::orb::Orb;
use crate::stub::{CallError, Delegate, ExceptionList, ObjectStub};

type NamingResult<T> = Result<T, CallError<NamingError>>;

fn write_name(out: &mut OutputStream, name: &Name) -> Result<(), SystemException> {
    Name::write(out, name)
}

/// Stub for `CosNaming::NamingContextExt`.
pub struct NamingContextStub {
    delegate: Delegate,
}

impl ObjectStub for NamingContextStub {
    fn delegate(&self) -> &Delegate {
        &self.delegate
    }
}

impl NamingContextStub {
    pub fn new(orb: &Orb, obj: ObjectRef) -> Self {
        Self {
            delegate: Delegate::new(orb, obj),
        }
    }

    /// Checked conversion: asks the object whether it is a naming context.
    pub fn narrow(orb: &Orb, obj: ObjectRef) -> Result<Self, SystemException> {
        if obj.is_nil() {
            return Err(SystemException::bad_param(minor::BAD_IOR, "cannot narrow a nil reference"));
        }
        let stub = Self::new(orb, obj);
        if stub.is_a(NAMING_CONTEXT_EXT_ID)? || stub.is_a(NAMING_CONTEXT_ID)? {
            Ok(stub)
        } else {
            Err(SystemException::bad_param(
                minor::BAD_IOR,
                "object is not a CosNaming::NamingContext",
            ))
        }
    }

    fn bind_common(
        &self,
        operation: &str,
        name: &Name,
        obj: &ObjectRef,
        raises: ExceptionList<NamingError>,
    ) -> NamingResult<()> {
        self.delegate.call(
            operation,
            true,
            |out| {
                write_name(out, name)?;
                ObjectRef::write(out, obj)
            },
            &raises,
            |_| Ok(()),
        )
    }

    pub fn bind(&self, name: &Name, obj: &ObjectRef) -> NamingResult<()> {
        self.bind_common("bind", name, obj, raises::binding())
    }

    pub fn rebind(&self, name: &Name, obj: &ObjectRef) -> NamingResult<()> {
        self.bind_common("rebind", name, obj, raises::lookup())
    }

    pub fn bind_context(&self, name: &Name, context: &ObjectRef) -> NamingResult<()> {
        self.bind_common("bind_context", name, context, raises::binding())
    }

    pub fn rebind_context(&self, name: &Name, context: &ObjectRef) -> NamingResult<()> {
        self.bind_common("rebind_context", name, context, raises::lookup())
    }

    pub fn resolve(&self, name: &Name) -> NamingResult<ObjectRef> {
        self.delegate.call(
            "resolve",
            true,
            |out| write_name(out, name),
            &raises::lookup(),
            |input| ObjectRef::read(input),
        )
    }

    pub fn unbind(&self, name: &Name) -> NamingResult<()> {
        self.delegate.call(
            "unbind",
            true,
            |out| write_name(out, name),
            &raises::lookup(),
            |_| Ok(()),
        )
    }

    /// New unbound context on the server hosting this one.
    pub fn new_context(&self) -> NamingResult<ObjectRef> {
        self.delegate.call(
            "new_context",
            true,
            |_| Ok(()),
            &raises::nothing(),
            |input| ObjectRef::read(input),
        )
    }

    pub fn bind_new_context(&self, name: &Name) -> NamingResult<ObjectRef> {
        self.delegate.call(
            "bind_new_context",
            true,
            |out| write_name(out, name),
            &raises::binding(),
            |input| ObjectRef::read(input),
        )
    }

    pub fn destroy(&self) -> NamingResult<()> {
        self.delegate.call(
            "destroy",
            true,
            |_| Ok(()),
            &raises::destroy(),
            |_| Ok(()),
        )
    }

    /// Up to `how_many` bindings into `bindings`; the rest, if any, through
    /// the iterator stored in `iterator` (nil otherwise).
    pub fn list(
        &self,
        how_many: u32,
        bindings: &mut Holder<Vec<Binding>>,
        iterator: &mut Holder<ObjectRef>,
    ) -> NamingResult<()> {
        self.delegate.call(
            "list",
            true,
            |out| {
                out.write_ulong(how_many);
                Ok(())
            },
            &raises::nothing(),
            |input| {
                bindings.read_from(input)?;
                iterator.read_from(input)
            },
        )
    }

    pub fn to_string(&self, name: &Name) -> NamingResult<String> {
        self.delegate.call(
            "to_string",
            true,
            |out| write_name(out, name),
            &raises::conversion(),
            |input| input.read_string(),
        )
    }

    pub fn to_name(&self, string_name: &str) -> NamingResult<Name> {
        self.delegate.call(
            "to_name",
            true,
            |out| out.write_string(string_name),
            &raises::conversion(),
            |input| Name::read(input),
        )
    }

    pub fn to_url(&self, address: &str, string_name: &str) -> NamingResult<String> {
        self.delegate.call(
            "to_url",
            true,
            |out| {
                out.write_string(address)?;
                out.write_string(string_name)
            },
            &raises::to_url(),
            |input| input.read_string(),
        )
    }

    pub fn resolve_str(&self, string_name: &str) -> NamingResult<ObjectRef> {
        self.delegate.call(
            "resolve_str",
            true,
            |out| out.write_string(string_name),
            &raises::lookup(),
            |input| ObjectRef::read(input),
        )
    }
}

/// Stub for `CosNaming::BindingIterator`.
pub struct BindingIteratorStub {
    delegate: Delegate,
}

impl ObjectStub for BindingIteratorStub {
    fn delegate(&self) -> &Delegate {
        &self.delegate
    }
}

impl BindingIteratorStub {
    pub fn new(orb: &Orb, obj: ObjectRef) -> Self {
        Self {
            delegate: Delegate::new(orb, obj),
        }
    }

    /// `false` once the iterator is exhausted.
    pub fn next_one(&self, binding: &mut Holder<Binding>) -> Result<bool, SystemException> {
        self.delegate
            .call(
                "next_one",
                true,
                |_| Ok(()),
                &ExceptionList::none(),
                |input| {
                    let more = input.read_boolean()?;
                    binding.read_from(input)?;
                    Ok(more)
                },
            )
            .map_err(CallError::into_system)
    }

    /// Next batch of at most `how_many` bindings; `how_many` must be non-zero.
    pub fn next_n(&self, how_many: u32, bindings: &mut Holder<Vec<Binding>>) -> Result<bool, SystemException> {
        self.delegate
            .call(
                "next_n",
                true,
                |out| {
                    out.write_ulong(how_many);
                    Ok(())
                },
                &ExceptionList::none(),
                |input| {
                    let more = input.read_boolean()?;
                    bindings.read_from(input)?;
                    Ok(more)
                },
            )
            .map_err(CallError::into_system)
    }

    pub fn destroy(&self) -> Result<(), SystemException> {
        self.delegate
            .call("destroy", true, |_| Ok(()), &ExceptionList::none(), |_| Ok(()))
            .map_err(CallError::into_system)
    }
}
