//! Compiled pattern constants.
//!
//! Every pattern here is a literal, so compilation cannot fail at runtime.

use std::sync::LazyLock;

use regex::Regex;

/// URI schemes accepted in `href`-like attributes: http(s), ftp(s), mailto,
/// tel, callto, cid, xmpp, or a relative/schemeless reference.
pub(crate) static ALLOWED_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:(?:f|ht)tps?|mailto|tel|callto|cid|xmpp):|[^a-z]|[a-z+.\-]+(?:[^a-z+.\-:]|$))",
    )
    .expect("allowed URI pattern is valid")
});

/// Script-capable constructs inside a `style` attribute.
pub(crate) static UNSAFE_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)expression\s*\(|javascript\s*:|vbscript\s*:")
        .expect("unsafe style pattern is valid")
});

/// Passes of the scheme stripper, applied in order.
pub(crate) static DANGEROUS_SCHEMES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"[<>]",
        r"(?i)javascript:",
        r"(?i)vbscript:",
        r"(?i)data:",
        r"(?i)file:",
        r"(?i)on\w+\s*=",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("dangerous scheme pattern is valid"))
    .collect()
});

/// SQL keywords scrubbed as whole words.
pub(crate) const SQL_KEYWORDS: &[&str] = &[
    "union", "select", "insert", "update", "delete", "drop", "create", "alter", "exec", "execute",
];

/// Passes of the SQL scrubber, applied once each, in order.
pub(crate) static SQL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let keywords = format!(r"(?i)\b(?:{})\b", SQL_KEYWORDS.join("|"));
    [
        keywords.as_str(),
        r"(?i)\b(?:and|or)\s+\d+\s*(?:<>|!=|<=|>=|=|<|>)",
        r"(?i)\b(?:and|or)\s+'[^']*'\s*(?:<>|!=|<=|>=|=|<|>)",
        r"--|/\*|\*/",
        r";",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("SQL pattern is valid"))
    .collect()
});

/// RFC-light email shape.
pub(crate) static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Phone number after whitespace removal.
pub(crate) static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+]?[1-9][0-9]{0,15}$").expect("phone pattern is valid"));

/// Absolute http(s) URL.
pub(crate) static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://.+").expect("url pattern is valid"));

/// Any run of whitespace, removed from phone numbers before matching.
pub(crate) static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
