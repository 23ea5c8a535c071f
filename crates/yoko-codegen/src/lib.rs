// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitStr};

/// Container options from `#[idl(...)]`
#[derive(Default)]
struct ContainerAttrs {
    id: Option<String>,
    name: Option<String>,
    exception: bool,
    alias: bool,
    local: bool,
}

/// `#[derive(Idl)]` macro: generates a `yoko::Helper` impl
///
/// Container attribute `#[idl(id = "IDL:...:1.0")]` is required. Optional:
/// - `name = "..."`: IDL name (default: last scope of the repository id)
/// - `exception`: IDL exception (id written first; also implements
///   `UserException`, `Display` and `Error`)
/// - `alias`: one-field tuple struct mapped to an IDL typedef
/// - `local`: local interface; marshalling always fails with MARSHAL
///
/// Fields and enum variants accept `#[idl(name = "...")]`.
///
/// Example:
/// ```ignore
/// use yoko::Idl;
///
/// #[derive(Idl)]
/// #[idl(id = "IDL:omg.org/CosTransactions/otid_t:1.0")]
/// pub struct OtidT {
///     #[idl(name = "formatID")]
///     pub format_id: i32,
///     pub bqual_length: i32,
///     pub tid: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Idl, attributes(idl))]
pub fn derive_idl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Idl)] does not support generic types",
        ));
    }

    let attrs = parse_container_attrs(&input.attrs)?;
    let Some(id) = attrs.id.clone() else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "missing #[idl(id = \"IDL:...\")]",
        ));
    };
    let idl_name = attrs
        .name
        .clone()
        .unwrap_or_else(|| name_from_id(&id).unwrap_or_else(|| input.ident.to_string()));

    if attrs.local {
        return Ok(expand_local(&input.ident, &id, &idl_name));
    }

    match &input.data {
        Data::Struct(data) if attrs.alias => expand_alias(input, &data.fields, &id, &idl_name),
        Data::Struct(data) => expand_struct(input, &data.fields, &attrs, &id, &idl_name),
        Data::Enum(data) => {
            if attrs.exception || attrs.alias {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "enums cannot be exceptions or aliases",
                ));
            }
            expand_enum(&input.ident, data, &id, &idl_name)
        }
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "unions are not supported",
        )),
    }
}

fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("idl")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                out.id = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("name") {
                out.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("exception") {
                out.exception = true;
            } else if meta.path.is_ident("alias") {
                out.alias = true;
            } else if meta.path.is_ident("local") {
                out.local = true;
            } else {
                return Err(meta.error("unknown idl attribute"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// `name = "..."` on a field or variant
fn member_name(attrs: &[Attribute], default: String) -> syn::Result<String> {
    let mut name = default;
    for attr in attrs.iter().filter(|a| a.path().is_ident("idl")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = meta.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(meta.error("only `name` is allowed here"))
            }
        })?;
    }
    Ok(name)
}

/// `IDL:omg.org/CosNaming/NameComponent:1.0` -> `NameComponent`
fn name_from_id(id: &str) -> Option<String> {
    let body = id.strip_prefix("IDL:")?;
    let body = body.rsplit_once(':').map_or(body, |(scoped, _version)| scoped);
    let name = body.rsplit('/').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

fn expand_local(ident: &Ident, id: &str, idl_name: &str) -> proc_macro2::TokenStream {
    quote! {
        impl ::yoko::Helper for #ident {
            fn id() -> &'static str {
                #id
            }

            fn type_code_in(registry: &::yoko::TypeCodeRegistry) -> ::yoko::TypeCode {
                registry.get_or_build(#id, |_| ::yoko::TypeCode::local_interface(#id, #idl_name))
            }

            fn write(
                _out: &mut ::yoko::OutputStream,
                _value: &Self,
            ) -> ::core::result::Result<(), ::yoko::SystemException> {
                ::core::result::Result::Err(::yoko::helper::local_object_error(#id))
            }

            fn read(
                _input: &mut ::yoko::InputStream,
            ) -> ::core::result::Result<Self, ::yoko::SystemException> {
                ::core::result::Result::Err(::yoko::helper::local_object_error(#id))
            }
        }
    }
}

fn expand_alias(
    input: &DeriveInput,
    fields: &Fields,
    id: &str,
    idl_name: &str,
) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;
    let inner = match fields {
        Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => &unnamed.unnamed[0].ty,
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "an alias must be a tuple struct with exactly one field",
            ))
        }
    };

    Ok(quote! {
        impl ::yoko::Helper for #ident {
            fn id() -> &'static str {
                #id
            }

            fn type_code_in(registry: &::yoko::TypeCodeRegistry) -> ::yoko::TypeCode {
                registry.get_or_build(#id, |registry| {
                    ::yoko::TypeCode::alias(
                        #id,
                        #idl_name,
                        <#inner as ::yoko::Helper>::type_code_in(registry),
                    )
                })
            }

            fn write(
                out: &mut ::yoko::OutputStream,
                value: &Self,
            ) -> ::core::result::Result<(), ::yoko::SystemException> {
                <#inner as ::yoko::Helper>::write(out, &value.0)
            }

            fn read(
                input: &mut ::yoko::InputStream,
            ) -> ::core::result::Result<Self, ::yoko::SystemException> {
                ::core::result::Result::Ok(Self(<#inner as ::yoko::Helper>::read(input)?))
            }
        }
    })
}

fn expand_struct(
    input: &DeriveInput,
    fields: &Fields,
    attrs: &ContainerAttrs,
    id: &str,
    idl_name: &str,
) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;
    let named = match fields {
        Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                ident,
                "tuple structs need #[idl(alias)]; use named fields for IDL structs",
            ))
        }
    };

    let mut members = Vec::with_capacity(named.len());
    let mut writes = Vec::with_capacity(named.len());
    let mut reads = Vec::with_capacity(named.len());
    for field in &named {
        let Some(field_ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "field must have a name"));
        };
        let ty = &field.ty;
        let name = member_name(&field.attrs, field_ident.to_string())?;
        members.push(quote! {
            ::yoko::StructMember::new(#name, <#ty as ::yoko::Helper>::type_code_in(registry))
        });
        writes.push(quote! {
            <#ty as ::yoko::Helper>::write(out, &value.#field_ident)?;
        });
        reads.push(quote! {
            #field_ident: <#ty as ::yoko::Helper>::read(input)?
        });
    }

    let constructor = if matches!(fields, Fields::Unit) {
        quote! { Self }
    } else {
        quote! { Self { #(#reads,)* } }
    };

    let (tc_ctor, write_id, read_id) = if attrs.exception {
        (
            quote! { ::yoko::TypeCode::exception },
            quote! { out.write_string(#id)?; },
            quote! { ::yoko::helper::read_exception_id(input, #id)?; },
        )
    } else {
        (quote! { ::yoko::TypeCode::structure }, quote! {}, quote! {})
    };

    let exception_impls = if attrs.exception {
        quote! {
            impl ::yoko::UserException for #ident {}

            impl ::core::fmt::Display for #ident {
                fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                    f.write_str(#idl_name)
                }
            }

            impl ::std::error::Error for #ident {}
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl ::yoko::Helper for #ident {
            fn id() -> &'static str {
                #id
            }

            fn type_code_in(registry: &::yoko::TypeCodeRegistry) -> ::yoko::TypeCode {
                registry.get_or_build(#id, |registry| {
                    #tc_ctor(#id, #idl_name, ::std::vec![#(#members),*])
                })
            }

            #[allow(unused_variables)]
            fn write(
                out: &mut ::yoko::OutputStream,
                value: &Self,
            ) -> ::core::result::Result<(), ::yoko::SystemException> {
                #write_id
                #(#writes)*
                ::core::result::Result::Ok(())
            }

            #[allow(unused_variables)]
            fn read(
                input: &mut ::yoko::InputStream,
            ) -> ::core::result::Result<Self, ::yoko::SystemException> {
                #read_id
                ::core::result::Result::Ok(#constructor)
            }
        }

        #exception_impls
    })
}

fn expand_enum(
    ident: &Ident,
    data: &syn::DataEnum,
    id: &str,
    idl_name: &str,
) -> syn::Result<proc_macro2::TokenStream> {
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(ident, "an IDL enum needs at least one label"));
    }

    let mut labels = Vec::with_capacity(data.variants.len());
    let mut to_ordinal = Vec::with_capacity(data.variants.len());
    let mut from_ordinal = Vec::with_capacity(data.variants.len());
    for (index, variant) in data.variants.iter().enumerate() {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "IDL enum variants cannot carry data",
            ));
        }
        let variant_ident = &variant.ident;
        let label = member_name(&variant.attrs, variant_ident.to_string())?;
        let ordinal = u32::try_from(index)
            .map_err(|_| syn::Error::new(Span::call_site(), "too many enum labels"))?;
        labels.push(label);
        to_ordinal.push(quote! { Self::#variant_ident => #ordinal });
        from_ordinal.push(quote! { #ordinal => ::core::result::Result::Ok(Self::#variant_ident) });
    }

    Ok(quote! {
        impl ::yoko::Helper for #ident {
            fn id() -> &'static str {
                #id
            }

            fn type_code_in(registry: &::yoko::TypeCodeRegistry) -> ::yoko::TypeCode {
                registry.get_or_build(#id, |_| {
                    ::yoko::TypeCode::enumeration(
                        #id,
                        #idl_name,
                        ::std::vec![#(::std::string::String::from(#labels)),*],
                    )
                })
            }

            fn write(
                out: &mut ::yoko::OutputStream,
                value: &Self,
            ) -> ::core::result::Result<(), ::yoko::SystemException> {
                out.write_ulong(match value {
                    #(#to_ordinal,)*
                });
                ::core::result::Result::Ok(())
            }

            fn read(
                input: &mut ::yoko::InputStream,
            ) -> ::core::result::Result<Self, ::yoko::SystemException> {
                match input.read_ulong()? {
                    #(#from_ordinal,)*
                    other => ::core::result::Result::Err(::yoko::helper::enum_out_of_range(#id, other)),
                }
            }
        }
    })
}
