use std::collections::HashSet;
use std::sync::LazyLock;

/// Tags kept by the rich-text filter.
pub const DEFAULT_ALLOWED_TAGS: &[&str] = &[
    "b", "i", "em", "strong", "a", "p", "br", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6",
    "span", "div",
];

/// Attributes kept on allowed tags.
pub const DEFAULT_ALLOWED_ATTRIBUTES: &[&str] = &["href", "target", "rel", "class", "id", "style"];

/// Body keys whose values are never rewritten (case-sensitive).
pub const DEFAULT_EXEMPT_FIELDS: &[&str] = &["password", "token", "secret", "apiKey", "privateKey"];

/// Headers never rewritten by the header sanitizer (case-insensitive).
pub const DEFAULT_EXEMPT_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "x-api-key",
    "x-auth-token",
    "x-csrf-token",
    "x-requested-with",
];

/// Headers additionally left alone by the comprehensive sanitizer.
pub const EXTENDED_EXEMPT_HEADERS: &[&str] = &["content-type", "content-length"];

/// `$`-prefixed keys that survive the NoSQL filter.
pub const DEFAULT_NOSQL_OPERATORS: &[&str] = &["$and", "$or", "$nor", "$not"];

/// Largest accepted serialized body + query, in bytes.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1_000_000;

/// Deepest nesting the checked tree walkers accept.
///
/// Matches the recursion limit `serde_json` applies while parsing.
pub const DEFAULT_MAX_DEPTH: usize = 128;

static GLOBAL: LazyLock<SanitizePolicy> = LazyLock::new(SanitizePolicy::default);

/// Which header exemption list a header sanitizer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderExemptions {
    /// Credentials and anti-forgery headers only.
    Standard,
    /// `Standard` plus `content-type` and `content-length`.
    Extended,
}

/// Immutable sanitization configuration.
///
/// A policy is built once at startup and shared (usually behind an `Arc`)
/// by every pipeline step. It holds the HTML allow-lists, the exemption
/// sets, the NoSQL operator allow-list and the size and depth limits.
///
/// # Examples
///
/// ```
/// use sanitize_core::{HeaderExemptions, SanitizePolicy};
///
/// let policy = SanitizePolicy::default();
/// assert!(policy.is_exempt_field("password"));
/// assert!(!policy.is_exempt_field("Password"));
/// assert!(policy.is_exempt_header("Authorization", HeaderExemptions::Standard));
/// assert!(!policy.is_exempt_header("Content-Type", HeaderExemptions::Standard));
/// assert!(policy.is_exempt_header("Content-Type", HeaderExemptions::Extended));
/// assert_eq!(policy.max_payload_bytes(), 1_000_000);
/// ```
#[derive(Debug, Clone)]
pub struct SanitizePolicy {
    allowed_tags: HashSet<String>,
    allowed_attributes: HashSet<String>,
    exempt_fields: HashSet<String>,
    exempt_headers: HashSet<String>,
    extended_exempt_headers: HashSet<String>,
    nosql_operators: HashSet<String>,
    max_payload_bytes: usize,
    max_depth: usize,
}

impl SanitizePolicy {
    /// Returns a builder starting from the default policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use sanitize_core::SanitizePolicy;
    ///
    /// let policy = SanitizePolicy::builder()
    ///     .allow_tag("blockquote")
    ///     .exempt_field("otp")
    ///     .max_payload_bytes(64 * 1024)
    ///     .build();
    ///
    /// assert!(policy.allows_tag("blockquote"));
    /// assert!(policy.is_exempt_field("otp"));
    /// assert_eq!(policy.max_payload_bytes(), 65_536);
    /// ```
    pub fn builder() -> SanitizePolicyBuilder {
        SanitizePolicyBuilder {
            policy: SanitizePolicy::default(),
        }
    }

    /// Process-wide default policy, used by the free functions.
    pub fn global() -> &'static SanitizePolicy {
        &GLOBAL
    }

    /// Returns `true` if the rich-text filter keeps this (lower-case) tag.
    pub fn allows_tag(&self, name: &str) -> bool {
        self.allowed_tags.contains(name)
    }

    /// Returns `true` if the rich-text filter keeps this (lower-case) attribute.
    pub fn allows_attribute(&self, name: &str) -> bool {
        self.allowed_attributes.contains(name)
    }

    /// Returns `true` if values under this key are copied through untouched.
    pub fn is_exempt_field(&self, key: &str) -> bool {
        self.exempt_fields.contains(key)
    }

    /// Returns `true` if this header must not be rewritten.
    ///
    /// Header names are compared case-insensitively.
    pub fn is_exempt_header(&self, name: &str, exemptions: HeaderExemptions) -> bool {
        let name = name.to_ascii_lowercase();
        self.exempt_headers.contains(&name)
            || (exemptions == HeaderExemptions::Extended
                && self.extended_exempt_headers.contains(&name))
    }

    /// Returns `true` if this `$`-prefixed key survives the NoSQL filter.
    pub fn allows_operator(&self, key: &str) -> bool {
        self.nosql_operators.contains(key)
    }

    /// Largest accepted serialized body + query, in bytes.
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Deepest nesting the checked tree walkers accept.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Default for SanitizePolicy {
    fn default() -> Self {
        Self {
            allowed_tags: to_set(DEFAULT_ALLOWED_TAGS),
            allowed_attributes: to_set(DEFAULT_ALLOWED_ATTRIBUTES),
            exempt_fields: to_set(DEFAULT_EXEMPT_FIELDS),
            exempt_headers: to_set(DEFAULT_EXEMPT_HEADERS),
            extended_exempt_headers: to_set(EXTENDED_EXEMPT_HEADERS),
            nosql_operators: to_set(DEFAULT_NOSQL_OPERATORS),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

fn to_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Builder for a customized [`SanitizePolicy`].
///
/// Additions extend the defaults; nothing can be removed from the
/// exemption sets, so a custom policy is never weaker about credentials.
#[derive(Debug, Clone)]
pub struct SanitizePolicyBuilder {
    policy: SanitizePolicy,
}

impl SanitizePolicyBuilder {
    /// Keeps an additional tag in rich text.
    ///
    /// Tags whose body is always dropped (`script`, `style`, ...) stay
    /// dropped even when allowed here.
    pub fn allow_tag(mut self, name: &str) -> Self {
        self.policy.allowed_tags.insert(name.to_ascii_lowercase());
        self
    }

    /// Keeps an additional attribute on allowed tags.
    pub fn allow_attribute(mut self, name: &str) -> Self {
        self.policy
            .allowed_attributes
            .insert(name.to_ascii_lowercase());
        self
    }

    /// Adds a body key whose value is never rewritten.
    pub fn exempt_field(mut self, key: &str) -> Self {
        self.policy.exempt_fields.insert(key.to_string());
        self
    }

    /// Adds a header that is never rewritten.
    pub fn exempt_header(mut self, name: &str) -> Self {
        self.policy
            .exempt_headers
            .insert(name.to_ascii_lowercase());
        self
    }

    /// Sets the payload limit used by the size guard.
    pub fn max_payload_bytes(mut self, limit: usize) -> Self {
        self.policy.max_payload_bytes = limit;
        self
    }

    /// Sets the maximum nesting depth for the checked tree walkers.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.policy.max_depth = depth;
        self
    }

    /// Finishes the policy.
    pub fn build(self) -> SanitizePolicy {
        self.policy
    }
}
