//! Derive macros for the ZCL identifier catalog.
//!
//! ```ignore
//! #[derive(ZclId)]
//! enum ClusterId {
//!     #[zcl(id = 0x0000, name = "genBasic")]
//!     GenBasic,
//!     #[zcl(id = 0x0006, name = "genOnOff")]
//!     GenOnOff,
//!     Unknown(u16),
//! }
//! ```
//!
//! See [`zcl-catalog`] for the generated trait usage: `spec.md` §6 requires
//! that catalog lookups round-trip unknown numeric ids, which is why every
//! derived enum must end in a single-field tuple variant that acts as the
//! catch-all.

extern crate proc_macro;

use proc_macro2::Span;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitInt, LitStr};

/// Derive `id()`/`name()`/`from_id()`/`Display`/`From<u16>` for a catalog enum.
///
/// Each named variant must carry `#[zcl(id = <int literal>, name = "<str>")]`.
/// Exactly one trailing unit-tuple variant of shape `Unknown(u16)` is
/// required; it is used both as the `from_id` fallback and to report
/// catalog misses without discarding the original numeric id.
#[proc_macro_derive(ZclId, attributes(zcl))]
pub fn derive_zcl_id(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;

    let variants = match input.data {
        Data::Enum(ref data) => &data.variants,
        _ => {
            return syn::Error::new(Span::call_site(), "ZclId can only be derived for enums")
                .to_compile_error()
                .into()
        }
    };

    let mut id_arms = Vec::new();
    let mut name_arms = Vec::new();
    let mut from_id_arms = Vec::new();
    let mut unknown_ident = None;

    for variant in variants {
        let variant_name = &variant.ident;

        if matches!(&variant.fields, Fields::Unnamed(f) if f.unnamed.len() == 1)
            && !variant.attrs.iter().any(|a| a.path().is_ident("zcl"))
        {
            if unknown_ident.is_some() {
                return syn::Error::new_spanned(
                    variant,
                    "only one catch-all tuple variant is allowed",
                )
                .to_compile_error()
                .into();
            }
            unknown_ident = Some(variant_name.clone());
            id_arms.push(quote! { #name::#variant_name(raw) => *raw });
            from_id_arms.push(None);
            continue;
        }

        let mut id_lit: Option<LitInt> = None;
        let mut name_lit: Option<LitStr> = None;
        for attr in variant.attrs.iter().filter(|a| a.path().is_ident("zcl")) {
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    id_lit = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("name") {
                    name_lit = Some(meta.value()?.parse()?);
                }
                Ok(())
            });
            if let Err(e) = parsed {
                return e.to_compile_error().into();
            }
        }

        let id_lit = match id_lit {
            Some(v) => v,
            None => {
                return syn::Error::new_spanned(variant, "missing #[zcl(id = ...)]")
                    .to_compile_error()
                    .into()
            }
        };
        let name_lit = match name_lit {
            Some(v) => v,
            None => {
                return syn::Error::new_spanned(variant, "missing #[zcl(name = \"...\")]")
                    .to_compile_error()
                    .into()
            }
        };

        id_arms.push(quote! { #name::#variant_name => #id_lit });
        name_arms.push(quote! { #name::#variant_name => Some(#name_lit) });
        from_id_arms.push(Some(quote! { #id_lit => #name::#variant_name }));
    }

    let unknown_ident = match unknown_ident {
        Some(v) => v,
        None => {
            return syn::Error::new(
                Span::call_site(),
                "ZclId requires a trailing catch-all variant, e.g. `Unknown(u16)`",
            )
            .to_compile_error()
            .into()
        }
    };

    let from_id_arms: Vec<_> = from_id_arms.into_iter().flatten().collect();

    let expanded = quote! {
        impl #name {
            /// Numeric ZCL identifier for this variant.
            pub fn id(&self) -> u16 {
                match self {
                    #(#id_arms),*
                }
            }

            /// Catalog name, or `None` when this is an unrecognised numeric id.
            pub fn name(&self) -> Option<&'static str> {
                match self {
                    #(#name_arms,)*
                    #name::#unknown_ident(_) => None,
                }
            }

            /// Resolve a numeric id to a catalog entry, falling back to the
            /// catch-all variant for ids the catalog does not know about.
            pub fn from_id(id: u16) -> Self {
                match id {
                    #(#from_id_arms),*,
                    other => #name::#unknown_ident(other),
                }
            }
        }

        impl ::core::fmt::Display for #name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match self.name() {
                    Some(n) => write!(f, "{n}"),
                    None => write!(f, "{:#06x}", self.id()),
                }
            }
        }

        impl ::core::convert::From<u16> for #name {
            fn from(id: u16) -> Self {
                #name::from_id(id)
            }
        }

        impl ::core::convert::From<#name> for u16 {
            fn from(value: #name) -> Self {
                value.id()
            }
        }
    };

    proc_macro::TokenStream::from(expanded)
}
