//! Shared proptest strategies and tree assertions for unit tests.

use proptest::prelude::*;

use crate::policy::{DEFAULT_EXEMPT_FIELDS, DEFAULT_NOSQL_OPERATORS};
use crate::{SanitizableValue, SanitizePolicy};

const MARKUP_FRAGMENTS: &[&str] = &[
    "text",
    "maize ",
    " & ",
    " < ",
    " > ",
    "&amp;",
    "&#60;",
    "\"",
    "'",
    "<b>",
    "</b>",
    "<i>",
    "</i>",
    "<p class=\"c\" onclick=\"z()\">",
    "</p>",
    "<a href=\"http://example.com\">",
    "<a href=\"javascript:alert(1)\">",
    "<a href=\"jav&#x61;script:x\">",
    "</a>",
    "<br>",
    "<br/>",
    "<img src=x onerror=alert(1)>",
    "<script>",
    "</script>",
    "<style>",
    "</style>",
    "<!-- note -->",
    "<div style=\"color:red\">",
    "</div>",
    "<SCRIPT >",
    "<iframe>",
    "</iframe>",
    "<textarea>",
    "</textarea>",
    "<title>",
    "</title>",
    "<b title='x",
    "<!-->",
];

/// Strings assembled from HTML fragments, balanced or not.
pub fn arb_markup() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(MARKUP_FRAGMENTS), 0..12)
        .prop_map(|parts| parts.concat())
}

/// Map keys mixing ordinary names, exempt fields and `$` operators.
pub fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z]{1,8}",
        1 => prop::sample::select(DEFAULT_EXEMPT_FIELDS).prop_map(String::from),
        1 => prop::sample::select(DEFAULT_NOSQL_OPERATORS).prop_map(String::from),
        1 => "\\$[a-z]{1,6}",
    ]
}

/// Arbitrary JSON-like trees with markup-bearing strings.
pub fn arb_value() -> impl Strategy<Value = SanitizableValue> {
    let leaf = prop_oneof![
        Just(SanitizableValue::Null),
        any::<bool>().prop_map(SanitizableValue::Bool),
        any::<i64>().prop_map(SanitizableValue::from),
        arb_markup().prop_map(SanitizableValue::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(SanitizableValue::Array),
            prop::collection::btree_map(arb_key(), inner, 0..6).prop_map(SanitizableValue::Map),
        ]
    })
}

/// Same keys, same array lengths, same non-string scalars.
pub fn same_shape(a: &SanitizableValue, b: &SanitizableValue) -> bool {
    match (a, b) {
        (SanitizableValue::String(_), SanitizableValue::String(_)) => true,
        (SanitizableValue::Array(x), SanitizableValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| same_shape(x, y))
        }
        (SanitizableValue::Map(x), SanitizableValue::Map(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y)
                    .all(|((kx, vx), (ky, vy))| kx == ky && same_shape(vx, vy))
        }
        _ => a == b,
    }
}

/// Every value under an exempt key in `input` is identical in `output`.
///
/// Assumes both trees have the same shape.
pub fn exempt_values_preserved(
    policy: &SanitizePolicy,
    input: &SanitizableValue,
    output: &SanitizableValue,
) -> bool {
    match (input, output) {
        (SanitizableValue::Array(x), SanitizableValue::Array(y)) => x
            .iter()
            .zip(y)
            .all(|(x, y)| exempt_values_preserved(policy, x, y)),
        (SanitizableValue::Map(x), SanitizableValue::Map(y)) => x.iter().all(|(key, vx)| {
            match y.get(key) {
                Some(vy) if policy.is_exempt_field(key) => vx == vy,
                Some(vy) => exempt_values_preserved(policy, vx, vy),
                None => false,
            }
        }),
        _ => true,
    }
}

/// Returns `true` if any map in the tree has a `$` key the policy rejects.
pub fn has_disallowed_operator(policy: &SanitizePolicy, value: &SanitizableValue) -> bool {
    match value {
        SanitizableValue::Array(items) => items.iter().any(|v| has_disallowed_operator(policy, v)),
        SanitizableValue::Map(map) => map.iter().any(|(key, v)| {
            (key.starts_with('$') && !policy.allows_operator(key))
                || has_disallowed_operator(policy, v)
        }),
        _ => false,
    }
}
