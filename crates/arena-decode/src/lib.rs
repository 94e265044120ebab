// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = "Tolerant text-to-action decoder with forensics."]
#![deny(unsafe_code)]
#![warn(missing_docs)]

//! arena-decode
//!
//! Gateway-backed agents answer in free-form text. This crate turns that
//! text into a schema-valid action, or falls back to the scenario
//! default, and always produces a forensic record of how it got there:
//! the method that succeeded, the digest and size of the raw text, the
//! candidate that parsed but failed validation, and the reason for any
//! fallback. Nothing here touches the event stream; the match runner
//! owns attaching forensics to events.

mod decoder;
mod schema;

pub use decoder::{
    DecodeLimits, DecodeMethod, DecodeOutcome, FallbackReason, decode_action,
};
pub use schema::{CompiledSchema, SchemaError};
