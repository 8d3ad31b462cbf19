//! Binding crate for Swift and Kotlin.
//!
//! Re-exports [`biokey_core`] together with its `UniFFI` scaffolding so a
//! single library is linked into the app.

pub use biokey_core::*;

biokey_core::uniffi_reexport_scaffolding!();
