//! Sanitizing steps: each one rewrites part of an [`IncomingRequest`].
//!
//! Every step computes its replacements first and assigns them only once all
//! of them succeeded, so a step that faults leaves the request as it found it.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StepError;
use crate::policy::HeaderExemptions;
use crate::sanitizer::TextFilter;
use crate::{SanitizableValue, SanitizePolicy};

use super::pipeline::RequestStep;
use super::{HeaderValue, IncomingRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Body,
    Query,
    Params,
}

/// Strips markup from every string in one request part.
///
/// Exempt keys are copied through. Empty parts (`Null`, `{}`, `[]`, `""`)
/// are skipped.
#[derive(Debug, Clone)]
pub struct SanitizePart {
    policy: Arc<SanitizePolicy>,
    part: Part,
}

impl SanitizePart {
    /// Sanitizes the body.
    pub fn body(policy: Arc<SanitizePolicy>) -> Self {
        Self { policy, part: Part::Body }
    }

    /// Sanitizes the query.
    pub fn query(policy: Arc<SanitizePolicy>) -> Self {
        Self { policy, part: Part::Query }
    }

    /// Sanitizes the route parameters.
    pub fn params(policy: Arc<SanitizePolicy>) -> Self {
        Self { policy, part: Part::Params }
    }
}

impl RequestStep for SanitizePart {
    fn name(&self) -> &'static str {
        match self.part {
            Part::Body => "sanitize_body",
            Part::Query => "sanitize_query",
            Part::Params => "sanitize_params",
        }
    }

    fn apply(&self, request: &mut IncomingRequest) -> Result<(), StepError> {
        let current = match self.part {
            Part::Body => request.body(),
            Part::Query => request.query(),
            Part::Params => request.params(),
        };
        if current.is_empty() {
            return Ok(());
        }
        let policy = &self.policy;
        let sanitized = policy.try_sanitize_tree(current, |s| policy.strip_scriptish(s))?;
        match self.part {
            Part::Body => request.set_body(sanitized),
            Part::Query => request.set_query(sanitized),
            Part::Params => request.set_params(sanitized),
        }
        Ok(())
    }
}

/// Strips markup from single-valued, non-exempt headers.
#[derive(Debug, Clone)]
pub struct SanitizeHeaders {
    policy: Arc<SanitizePolicy>,
    exemptions: HeaderExemptions,
}

impl SanitizeHeaders {
    /// Leaves credential and anti-forgery headers alone.
    pub fn standard(policy: Arc<SanitizePolicy>) -> Self {
        Self {
            policy,
            exemptions: HeaderExemptions::Standard,
        }
    }

    /// Also leaves `content-type` and `content-length` alone.
    pub fn extended(policy: Arc<SanitizePolicy>) -> Self {
        Self {
            policy,
            exemptions: HeaderExemptions::Extended,
        }
    }
}

impl RequestStep for SanitizeHeaders {
    fn name(&self) -> &'static str {
        "sanitize_headers"
    }

    fn apply(&self, request: &mut IncomingRequest) -> Result<(), StepError> {
        let headers = sanitize_headers(&self.policy, request.headers(), self.exemptions);
        request.set_headers(headers);
        Ok(())
    }
}

fn sanitize_headers(
    policy: &SanitizePolicy,
    headers: &BTreeMap<String, HeaderValue>,
    exemptions: HeaderExemptions,
) -> BTreeMap<String, HeaderValue> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = match value {
                HeaderValue::Single(s) if !policy.is_exempt_header(name, exemptions) => {
                    HeaderValue::Single(policy.strip_scriptish(s))
                }
                other => other.clone(),
            };
            (name.clone(), value)
        })
        .collect()
}

/// Strips markup from the client-supplied names of uploaded files.
#[derive(Debug, Clone)]
pub struct SanitizeFileNames {
    policy: Arc<SanitizePolicy>,
}

impl SanitizeFileNames {
    /// Creates the step.
    pub fn new(policy: Arc<SanitizePolicy>) -> Self {
        Self { policy }
    }
}

impl RequestStep for SanitizeFileNames {
    fn name(&self) -> &'static str {
        "sanitize_file_names"
    }

    fn apply(&self, request: &mut IncomingRequest) -> Result<(), StepError> {
        let files = request
            .files()
            .map(|files| files.map_names(|name| self.policy.strip_scriptish(name)));
        if files.is_some() {
            request.set_files(files);
        }
        Ok(())
    }
}

/// Filters a fixed set of top-level string fields of a map body.
///
/// Other fields, non-string values and non-map bodies are left alone.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use sanitize_core::web::{IncomingRequest, RequestStep, SanitizeFields};
/// use sanitize_core::{SanitizableValue, SanitizePolicy};
/// use serde_json::json;
///
/// let step = SanitizeFields::rich_text(Arc::new(SanitizePolicy::default()), ["description"]);
/// let mut request = IncomingRequest::new("req-1").with_body(SanitizableValue::from(json!({
///     "description": "<p>Fresh <b>yams</b></p><script>x()</script>",
///     "title": "<b>Yams</b>"
/// })));
///
/// step.apply(&mut request).unwrap();
///
/// let body = request.body();
/// assert_eq!(body.get("description").and_then(|v| v.as_str()), Some("<p>Fresh <b>yams</b></p>"));
/// assert_eq!(body.get("title").and_then(|v| v.as_str()), Some("<b>Yams</b>"));
/// ```
#[derive(Debug, Clone)]
pub struct SanitizeFields {
    policy: Arc<SanitizePolicy>,
    fields: Vec<String>,
    filter: TextFilter,
}

impl SanitizeFields {
    /// Strips markup from the named fields.
    pub fn new<I, S>(policy: Arc<SanitizePolicy>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            policy,
            fields: fields.into_iter().map(Into::into).collect(),
            filter: TextFilter::default(),
        }
    }

    /// Keeps the rich-text allow-list in the named fields.
    pub fn rich_text<I, S>(policy: Arc<SanitizePolicy>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(policy, fields).with_filter(TextFilter::RichText)
    }

    /// Replaces the filter applied to each field.
    pub fn with_filter(mut self, filter: TextFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The fields this step rewrites.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl RequestStep for SanitizeFields {
    fn name(&self) -> &'static str {
        "sanitize_fields"
    }

    fn apply(&self, request: &mut IncomingRequest) -> Result<(), StepError> {
        let Some(map) = request.body_mut().as_map_mut() else {
            return Ok(());
        };
        for field in &self.fields {
            if let Some(SanitizableValue::String(text)) = map.get_mut(field) {
                *text = self.filter.apply(&self.policy, text);
            }
        }
        Ok(())
    }
}

/// Full sanitization of a request in one step.
///
/// - body and query: markup stripped, then NoSQL operators dropped and SQL
///   idioms scrubbed
/// - params: markup stripped
/// - headers: markup stripped, using the extended exemption list
///
/// Empty parts are skipped. If any part faults, nothing is assigned.
#[derive(Debug, Clone)]
pub struct ComprehensiveSanitizer {
    policy: Arc<SanitizePolicy>,
}

impl ComprehensiveSanitizer {
    /// Creates the step.
    pub fn new(policy: Arc<SanitizePolicy>) -> Self {
        Self { policy }
    }

    fn strip(&self, value: &SanitizableValue) -> Result<Option<SanitizableValue>, StepError> {
        if value.is_empty() {
            return Ok(None);
        }
        let policy = &self.policy;
        Ok(Some(
            policy.try_sanitize_tree(value, |s| policy.strip_scriptish(s))?,
        ))
    }

    fn strip_and_filter(
        &self,
        value: &SanitizableValue,
    ) -> Result<Option<SanitizableValue>, StepError> {
        match self.strip(value)? {
            Some(stripped) => Ok(Some(
                self.policy.try_sanitize_against_nosql_injection(&stripped)?,
            )),
            None => Ok(None),
        }
    }
}

impl RequestStep for ComprehensiveSanitizer {
    fn name(&self) -> &'static str {
        "comprehensive_sanitizer"
    }

    fn apply(&self, request: &mut IncomingRequest) -> Result<(), StepError> {
        let body = self.strip_and_filter(request.body())?;
        let query = self.strip_and_filter(request.query())?;
        let params = self.strip(request.params())?;
        let headers =
            sanitize_headers(&self.policy, request.headers(), HeaderExemptions::Extended);

        if let Some(body) = body {
            request.set_body(body);
        }
        if let Some(query) = query {
            request.set_query(query);
        }
        if let Some(params) = params {
            request.set_params(params);
        }
        request.set_headers(headers);
        Ok(())
    }
}
