//! Request sanitization for JSON-shaped web input.
//!
//! This crate cleans untrusted request data before route handlers see it:
//! - **Text filters**: strip markup, keep a rich-text allow-list, remove
//!   dangerous URI schemes, scrub SQL injection idioms
//! - **Tree walkers**: apply a filter to every string of a nested value while
//!   leaving credential fields alone, or drop NoSQL query operators
//! - **Request pipeline**: framework-agnostic steps that sanitize body,
//!   query, params, headers and file names, plus fail-closed size and
//!   shape guards
//!
//! # Core Types
//!
//! - [`SanitizableValue`]: the JSON-like tree every walker operates on
//! - [`SanitizePolicy`]: immutable allow-lists, exemptions and limits
//! - [`TextFilter`]: a leaf transform chosen per field
//! - [`web::Pipeline`]: ordered request steps with fail-open fault handling
//! - [`Rejection`]: a client error produced by a guard
//!
//! # Examples
//!
//! ```
//! use sanitize_core::{sanitize_tree, strip_scriptish, SanitizableValue};
//! use serde_json::json;
//!
//! let body = SanitizableValue::from(json!({
//!     "name": "<script>alert('xss')</script>John",
//!     "password": "<script>keep</script>"
//! }));
//!
//! let clean = sanitize_tree(&body, strip_scriptish);
//! assert_eq!(
//!     serde_json::Value::from(clean),
//!     json!({"name": "John", "password": "<script>keep</script>"})
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod logging;
mod markup;
mod patterns;
mod policy;
mod sanitizer;
mod tree;
mod value;
pub mod web;

#[cfg(test)]
mod test_utils;

pub use error::{ErrorBody, FaultKind, Rejection, RejectionKind, SanitizeFault, StepError};
pub use logging::StepLog;
pub use policy::{
    HeaderExemptions, SanitizePolicy, SanitizePolicyBuilder, DEFAULT_ALLOWED_ATTRIBUTES,
    DEFAULT_ALLOWED_TAGS, DEFAULT_EXEMPT_FIELDS, DEFAULT_EXEMPT_HEADERS, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_NOSQL_OPERATORS, EXTENDED_EXEMPT_HEADERS,
};
pub use sanitizer::{
    sanitize_rich_text, scrub_sql_patterns, strip_dangerous_schemes, strip_scriptish, TextFilter,
};
pub use tree::{sanitize_against_nosql_injection, sanitize_tree};
pub use value::SanitizableValue;
