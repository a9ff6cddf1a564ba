//! JSON codec and dynamic value model.
//!
//! All protocol data (request parameters, tool arguments, results) is carried
//! as [`Value`]. Text is turned into values by [`from_str`] and values of any
//! `serde::Serialize` type are turned back into text by [`to_string`].
//!
//! ```text
//!   text ──from_str──▶ Value ──write_compact──▶ text
//!                        ▲
//!   T: Serialize ──to_value
//! ```
//!
//! The distinction between integer and floating-point literals survives a
//! round trip: `2` reads back as [`Number::Int`] and `2.0` as
//! [`Number::Float`].

mod error;
mod parser;
mod ser;
mod value;
mod writer;

pub use error::{Error, Result};
pub use parser::{from_str, MAX_DEPTH};
pub use ser::{to_value, ValueSerializer};
pub use value::{Map, Number, Value};
pub use writer::{write_compact, write_pretty};

use serde::Serialize;

/// Serialises any value to compact JSON text.
///
/// # Errors
///
/// Returns [`Error::Serialize`] if the value cannot be represented as JSON.
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    to_value(value).map(|v| write_compact(&v))
}

/// Serialises any value to indented JSON text.
///
/// # Errors
///
/// Returns [`Error::Serialize`] if the value cannot be represented as JSON.
pub fn to_string_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    to_value(value).map(|v| write_pretty(&v))
}
