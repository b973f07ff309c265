/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! Lattice Macro Library
//!
//! This library provides procedural macros for the Lattice message bus.
//! It includes macros to derive common traits and boilerplate code for bus
//! payloads.
//!
//! # Payload Macro
//!
//! The [`bus_payload`] macro simplifies creating payload types for bus
//! messages:
//!
//! ```ignore
//! // Basic payload for in-process messaging
//! #[bus_payload]
//! pub struct Ping;
//!
//! // Wire-enabled payload with serialization support
//! #[bus_payload(wire)]
//! pub struct Reading {
//!     pub value: f64,
//! }
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, DeriveInput};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(trait_name) {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

/// Configuration options parsed from `#[bus_payload(...)]` attributes.
#[derive(Default)]
struct PayloadConfig {
    /// Enable serde serialization so the payload can cross the wire.
    wire: bool,
}

impl PayloadConfig {
    /// Parse configuration from attribute tokens.
    fn parse(attr: &TokenStream) -> Self {
        let mut config = Self::default();

        let attr_string = attr.to_string();
        for part in attr_string.split(',') {
            let trimmed = part.trim();
            if trimmed == "wire" {
                config.wire = true;
            }
        }

        config
    }
}

/// A procedural macro to derive the necessary traits for a bus payload.
///
/// This macro automatically implements the traits required for a type to be
/// carried inside a bus message. It ensures compile-time verification that
/// the payload type satisfies `Send + Sync` bounds.
///
/// # Basic Usage
///
/// ```ignore
/// use lattice_macro::bus_payload;
///
/// #[bus_payload]
/// pub struct Ping;
///
/// #[bus_payload]
/// pub struct Increment {
///     pub amount: u32,
/// }
/// ```
///
/// This expands to:
/// - `#[derive(Clone, Debug)]` (if not already present)
/// - A compile-time assertion that the type is `Send + Sync + 'static`
///
/// # Wire Support
///
/// For payloads that need to cross runtime boundaries, use the `wire`
/// option:
///
/// ```ignore
/// use lattice_macro::bus_payload;
///
/// #[bus_payload(wire)]
/// pub struct Reading {
///     pub value: f64,
/// }
/// ```
///
/// This additionally derives `serde::Serialize` and `serde::Deserialize`.
///
/// **Note:** The `wire` option requires `serde` to be available in scope.
#[proc_macro_attribute]
pub fn bus_payload(attr: TokenStream, item: TokenStream) -> TokenStream {
    // Parse configuration from attributes
    let config = PayloadConfig::parse(&attr);

    // Parse the input tokens into a syntax tree.
    let input = parse_macro_input!(item as DeriveInput);

    // Get the name and generics of the struct.
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    // Determine which traits need to be derived
    let need_clone = !has_derive(&input, "Clone");
    let need_debug = !has_derive(&input, "Debug");

    // Build the list of traits to derive
    let derives = {
        let mut traits = Vec::new();
        if need_clone {
            traits.push(quote!(Clone));
        }
        if need_debug {
            traits.push(quote!(Debug));
        }
        if config.wire {
            // Only add serde derives if not already present
            if !has_derive(&input, "Serialize") {
                traits.push(quote!(serde::Serialize));
            }
            if !has_derive(&input, "Deserialize") {
                traits.push(quote!(serde::Deserialize));
            }
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    // Generate a unique identifier for the static assertion to avoid conflicts
    let assert_ident = quote::format_ident!("_AssertBusPayload_{}", name);

    let expanded = quote! {
        #derives
        #input

        // Compile-time assertion that the payload type satisfies Send + Sync + 'static.
        // This catches invalid payload types early with clear error messages.
        #[doc(hidden)]
        #[allow(dead_code, non_camel_case_types, non_snake_case, clippy::needless_lifetimes)]
        const _: () = {
            fn #assert_ident #impl_generics () #where_clause {
                fn assert_bounds<T: Send + Sync + 'static>() {}
                assert_bounds::<#name #ty_generics>();
            }
        };
    };

    // Return the generated tokens.
    TokenStream::from(expanded)
}
