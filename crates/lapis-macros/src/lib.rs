//! Procedural macros for the Lapis runtime.
//!
//! - `#[derive(Injectable)]` - wires fields marked `#[inject]` from the
//!   container
//!
//! # Injectable Derive Macro
//!
//! ```rust,ignore
//! use lapis_macros::Injectable;
//!
//! #[derive(Default, Injectable)]
//! pub struct SignupHandler {
//!     #[inject]
//!     users: Option<Arc<dyn UserStore>>,
//!     #[inject]
//!     settings: Option<Arc<Settings>>,
//!     // not wired
//!     attempts: u32,
//! }
//! ```

mod inject;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `lapis_core::container::Injectable` for a struct.
///
/// Every field marked `#[inject]` must have the type `Option<Arc<T>>`; it is
/// assigned `Some(scope.resolve::<T>()?)`. Unmarked fields are left as they
/// are. Marking a field of any other shape is a compile error.
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match inject::derive_injectable(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
