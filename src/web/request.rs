//! Framework-agnostic request model the pipeline steps operate on.

use std::collections::BTreeMap;

use crate::SanitizableValue;

/// The parts of an HTTP request that the sanitizers read and rewrite.
///
/// `IncomingRequest` holds simple, owned data so that it does not couple to
/// any framework's request type. A framework integration fills it from its
/// own request, runs a [`Pipeline`](super::Pipeline) over it, and copies the
/// sanitized parts back.
///
/// `body`, `query` and `params` are `Null` until set.
///
/// # Examples
///
/// ```
/// use sanitize_core::web::{HeaderValue, IncomingRequest};
/// use sanitize_core::SanitizableValue;
/// use serde_json::json;
///
/// let mut request = IncomingRequest::new("req-12345")
///     .with_body(SanitizableValue::from(json!({"crop": "maize"})));
/// request.add_query_param("page", "2");
/// request.add_path_param("id", "42");
/// request.add_header("User-Agent", "curl/8");
///
/// assert_eq!(request.query().get("page").and_then(|v| v.as_str()), Some("2"));
/// assert_eq!(request.header("user-agent"), Some(&HeaderValue::from("curl/8")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomingRequest {
    request_id: String,
    body: SanitizableValue,
    query: SanitizableValue,
    params: SanitizableValue,
    headers: BTreeMap<String, HeaderValue>,
    files: Option<UploadedFiles>,
}

impl IncomingRequest {
    /// Creates an empty request with the given id.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }

    /// Sets the parsed body.
    pub fn with_body(mut self, body: SanitizableValue) -> Self {
        self.body = body;
        self
    }

    /// Sets the parsed query.
    pub fn with_query(mut self, query: SanitizableValue) -> Self {
        self.query = query;
        self
    }

    /// Sets the uploaded files.
    pub fn with_files(mut self, files: UploadedFiles) -> Self {
        self.files = Some(files);
        self
    }

    /// Adds one string query parameter, turning the query into a map if needed.
    pub fn add_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        insert_string(&mut self.query, key.into(), value.into());
    }

    /// Adds one route parameter.
    pub fn add_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        insert_string(&mut self.params, key.into(), value.into());
    }

    /// Adds a single-valued header.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(name.into(), HeaderValue::Single(value.into()));
    }

    /// Adds a header that arrived several times (for example `set-cookie`).
    pub fn add_header_values(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.headers.insert(name.into(), HeaderValue::Multiple(values));
    }

    /// Returns the request id.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the body (`Null` if absent).
    pub fn body(&self) -> &SanitizableValue {
        &self.body
    }

    /// Returns the query (`Null` if absent).
    pub fn query(&self) -> &SanitizableValue {
        &self.query
    }

    /// Returns the route parameters (`Null` if absent).
    pub fn params(&self) -> &SanitizableValue {
        &self.params
    }

    /// Returns all headers, keyed by the name they were added with.
    pub fn headers(&self) -> &BTreeMap<String, HeaderValue> {
        &self.headers
    }

    /// Looks up a header case-insensitively.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Returns the uploaded files, if any.
    pub fn files(&self) -> Option<&UploadedFiles> {
        self.files.as_ref()
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: SanitizableValue) {
        self.body = body;
    }

    /// Replaces the query.
    pub fn set_query(&mut self, query: SanitizableValue) {
        self.query = query;
    }

    /// Replaces the route parameters.
    pub fn set_params(&mut self, params: SanitizableValue) {
        self.params = params;
    }

    pub(crate) fn body_mut(&mut self) -> &mut SanitizableValue {
        &mut self.body
    }

    pub(crate) fn set_headers(&mut self, headers: BTreeMap<String, HeaderValue>) {
        self.headers = headers;
    }

    pub(crate) fn set_files(&mut self, files: Option<UploadedFiles>) {
        self.files = files;
    }

    /// Consumes the request, returning its sanitized parts.
    pub fn into_parts(self) -> RequestParts {
        RequestParts {
            body: self.body,
            query: self.query,
            params: self.params,
            headers: self.headers,
            files: self.files,
        }
    }
}

fn insert_string(target: &mut SanitizableValue, key: String, value: String) {
    if target.as_map().is_none() {
        *target = SanitizableValue::empty_map();
    }
    if let Some(map) = target.as_map_mut() {
        map.insert(key, SanitizableValue::String(value));
    }
}

/// Owned parts of a request after the pipeline ran.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParts {
    /// Parsed body
    pub body: SanitizableValue,
    /// Parsed query
    pub query: SanitizableValue,
    /// Route parameters
    pub params: SanitizableValue,
    /// Headers by name
    pub headers: BTreeMap<String, HeaderValue>,
    /// Uploaded files
    pub files: Option<UploadedFiles>,
}

/// A header value as delivered by the framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// One value; the only kind the header sanitizer rewrites.
    Single(String),
    /// A repeated header; passed through unchanged.
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// Returns the value if it is a single string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Single(s) => Some(s),
            HeaderValue::Multiple(_) => None,
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(s: &str) -> Self {
        HeaderValue::Single(s.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(s: String) -> Self {
        HeaderValue::Single(s)
    }
}

/// Metadata of one uploaded file. The content itself never reaches the sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadedFile {
    /// Form field the file was uploaded under
    pub field_name: String,
    /// File name supplied by the client
    pub original_name: Option<String>,
    /// Declared MIME type
    pub mime_type: Option<String>,
    /// Size in bytes
    pub size: u64,
}

impl UploadedFile {
    /// Creates file metadata with a client-supplied name.
    pub fn new(field_name: impl Into<String>, original_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            original_name: Some(original_name.into()),
            ..Self::default()
        }
    }
}

/// Uploaded files, either as one list or grouped by form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadedFiles {
    /// Files from a single-field or any-field upload
    List(Vec<UploadedFile>),
    /// Files grouped by field name
    Fields(BTreeMap<String, Vec<UploadedFile>>),
}

impl UploadedFiles {
    /// Iterates over every file regardless of grouping.
    pub fn iter(&self) -> Box<dyn Iterator<Item = &UploadedFile> + '_> {
        match self {
            UploadedFiles::List(files) => Box::new(files.iter()),
            UploadedFiles::Fields(groups) => Box::new(groups.values().flatten()),
        }
    }

    /// Returns a copy with `f` applied to every original file name.
    pub(crate) fn map_names<F>(&self, f: F) -> UploadedFiles
    where
        F: Fn(&str) -> String,
    {
        let rename = |file: &UploadedFile| UploadedFile {
            original_name: file.original_name.as_deref().map(&f),
            ..file.clone()
        };
        match self {
            UploadedFiles::List(files) => UploadedFiles::List(files.iter().map(rename).collect()),
            UploadedFiles::Fields(groups) => UploadedFiles::Fields(
                groups
                    .iter()
                    .map(|(field, files)| (field.clone(), files.iter().map(rename).collect()))
                    .collect(),
            ),
        }
    }
}
