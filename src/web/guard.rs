//! Fail-closed guards: the size limit and the contact-field shape check.
//!
//! Unlike the sanitizing steps, these answer the client directly when the
//! request breaks a rule.

use crate::error::{Rejection, StepError};
use crate::patterns::{EMAIL, PHONE, URL, WHITESPACE};
use crate::{SanitizableValue, SanitizePolicy};

use super::pipeline::RequestStep;
use super::IncomingRequest;

/// Rejects requests whose serialized body plus query exceed a byte limit.
///
/// Sizes are measured as compact JSON; an absent (`Null`) part counts as
/// zero bytes. A request exactly at the limit passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeGuard {
    limit: usize,
}

impl SizeGuard {
    /// Creates a guard with an explicit limit in bytes.
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Creates a guard using the policy's payload limit.
    pub fn from_policy(policy: &SanitizePolicy) -> Self {
        Self::new(policy.max_payload_bytes())
    }

    /// The limit in bytes.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Serialized size of body plus query.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn measure(request: &IncomingRequest) -> Result<usize, serde_json::Error> {
        Ok(request.body().serialized_len()? + request.query().serialized_len()?)
    }
}

impl RequestStep for SizeGuard {
    fn name(&self) -> &'static str {
        "size_guard"
    }

    fn apply(&self, request: &mut IncomingRequest) -> Result<(), StepError> {
        let size = Self::measure(request)?;
        if size > self.limit {
            return Err(Rejection::payload_too_large(size, self.limit).into());
        }
        Ok(())
    }
}

/// Checks the optional `email`, `phone` and `url` fields of a map body.
///
/// A falsy field (missing, `null`, `false`, `""`, `0`) is not checked. Other
/// numbers are checked by their decimal text; any other non-string value
/// fails.
/// Non-map bodies pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapeValidator;

impl ShapeValidator {
    fn check(body: &SanitizableValue) -> Result<(), Rejection> {
        if body.as_map().is_none() {
            return Ok(());
        }
        if let Some(email) = present(body, "email") {
            if !email.as_deref().is_some_and(|e| EMAIL.is_match(e)) {
                return Err(Rejection::invalid_field("email", "Invalid email format"));
            }
        }
        if let Some(phone) = present(body, "phone") {
            let valid = phone
                .as_deref()
                .map(|p| WHITESPACE.replace_all(p, ""))
                .is_some_and(|p| PHONE.is_match(&p));
            if !valid {
                return Err(Rejection::invalid_field("phone", "Invalid phone number format"));
            }
        }
        if let Some(url) = present(body, "url") {
            if !url.as_deref().is_some_and(|u| URL.is_match(u)) {
                return Err(Rejection::invalid_field("url", "Invalid URL format"));
            }
        }
        Ok(())
    }
}

/// `None` if the field is absent; `Some(None)` if present but not text-like.
fn present(body: &SanitizableValue, field: &str) -> Option<Option<String>> {
    match body.get(field)? {
        SanitizableValue::Null | SanitizableValue::Bool(false) => None,
        SanitizableValue::String(s) if s.is_empty() => None,
        SanitizableValue::Number(n) if n.as_f64() == Some(0.0) => None,
        SanitizableValue::String(s) => Some(Some(s.clone())),
        SanitizableValue::Number(n) => Some(Some(n.to_string())),
        SanitizableValue::Bool(true) | SanitizableValue::Array(_) | SanitizableValue::Map(_) => {
            Some(None)
        }
    }
}

impl RequestStep for ShapeValidator {
    fn name(&self) -> &'static str {
        "shape_validator"
    }

    fn apply(&self, request: &mut IncomingRequest) -> Result<(), StepError> {
        Self::check(request.body())?;
        Ok(())
    }
}
