//! Recursive walkers over [`SanitizableValue`] trees.
//!
//! Two different key policies live here and must stay separate:
//! - [`sanitize_tree`] copies values under exempt keys (`password`, ...)
//!   through untouched and never removes a key.
//! - [`sanitize_against_nosql_injection`] drops `$`-prefixed keys that are
//!   not allow-listed operators and recurses into everything else.

use std::collections::BTreeMap;

use crate::error::SanitizeFault;
use crate::sanitizer::scrub_sql_patterns;
use crate::{SanitizableValue, SanitizePolicy};

impl SanitizePolicy {
    /// Applies `leaf` to every string in `value`, skipping exempt keys.
    ///
    /// Builds a new tree with the same shape. Recursion is unbounded; use
    /// [`try_sanitize_tree`](Self::try_sanitize_tree) for untrusted nesting.
    ///
    /// # Stack usage
    ///
    /// Each level of nesting takes a stack frame. Trees parsed by `serde_json`
    /// are at most 128 levels deep, but a tree built in code can be nested far
    /// enough to overflow the stack, which aborts the process and cannot be
    /// caught. Such trees must go through the checked variant.
    pub fn sanitize_tree<F>(&self, value: &SanitizableValue, leaf: F) -> SanitizableValue
    where
        F: Fn(&str) -> String,
    {
        // no real tree reaches usize::MAX levels
        self.walk_exempting(value, &leaf, 0, usize::MAX)
            .unwrap_or_else(|_| value.clone())
    }

    /// Like [`sanitize_tree`](Self::sanitize_tree), but fails instead of
    /// recursing past [`max_depth`](Self::max_depth).
    ///
    /// # Errors
    ///
    /// Returns a `DepthExceeded` fault when the tree is nested too deeply.
    pub fn try_sanitize_tree<F>(
        &self,
        value: &SanitizableValue,
        leaf: F,
    ) -> Result<SanitizableValue, SanitizeFault>
    where
        F: Fn(&str) -> String,
    {
        self.walk_exempting(value, &leaf, 0, self.max_depth())
    }

    /// Drops non-allow-listed `$` keys and scrubs SQL idioms from strings.
    ///
    /// Recursion is unbounded; see
    /// [`try_sanitize_against_nosql_injection`](Self::try_sanitize_against_nosql_injection).
    ///
    /// # Stack usage
    ///
    /// Same limits as [`sanitize_tree`](Self::sanitize_tree): only trees of
    /// bounded depth, such as those parsed by `serde_json`, are safe here.
    pub fn sanitize_against_nosql_injection(&self, value: &SanitizableValue) -> SanitizableValue {
        self.walk_operators(value, 0, usize::MAX)
            .unwrap_or_else(|_| value.clone())
    }

    /// Like [`sanitize_against_nosql_injection`](Self::sanitize_against_nosql_injection),
    /// but fails instead of recursing past [`max_depth`](Self::max_depth).
    ///
    /// # Errors
    ///
    /// Returns a `DepthExceeded` fault when the tree is nested too deeply.
    pub fn try_sanitize_against_nosql_injection(
        &self,
        value: &SanitizableValue,
    ) -> Result<SanitizableValue, SanitizeFault> {
        self.walk_operators(value, 0, self.max_depth())
    }

    fn walk_exempting(
        &self,
        value: &SanitizableValue,
        leaf: &dyn Fn(&str) -> String,
        depth: usize,
        limit: usize,
    ) -> Result<SanitizableValue, SanitizeFault> {
        if depth > limit {
            return Err(SanitizeFault::depth_exceeded(limit));
        }
        let sanitized = match value {
            SanitizableValue::String(s) => SanitizableValue::String(leaf(s)),
            SanitizableValue::Array(items) => SanitizableValue::Array(
                items
                    .iter()
                    .map(|item| self.walk_exempting(item, leaf, depth + 1, limit))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            SanitizableValue::Map(map) => {
                let mut out = BTreeMap::new();
                for (key, child) in map {
                    let child = if self.is_exempt_field(key) {
                        child.clone()
                    } else {
                        self.walk_exempting(child, leaf, depth + 1, limit)?
                    };
                    out.insert(key.clone(), child);
                }
                SanitizableValue::Map(out)
            }
            SanitizableValue::Null | SanitizableValue::Bool(_) | SanitizableValue::Number(_) => {
                value.clone()
            }
        };
        Ok(sanitized)
    }

    fn walk_operators(
        &self,
        value: &SanitizableValue,
        depth: usize,
        limit: usize,
    ) -> Result<SanitizableValue, SanitizeFault> {
        if depth > limit {
            return Err(SanitizeFault::depth_exceeded(limit));
        }
        let sanitized = match value {
            SanitizableValue::String(s) => SanitizableValue::String(scrub_sql_patterns(s)),
            SanitizableValue::Array(items) => SanitizableValue::Array(
                items
                    .iter()
                    .map(|item| self.walk_operators(item, depth + 1, limit))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            SanitizableValue::Map(map) => {
                let mut out = BTreeMap::new();
                for (key, child) in map {
                    if key.starts_with('$') && !self.allows_operator(key) {
                        tracing::debug!(
                            key = %key,
                            value = child.kind(),
                            "dropped disallowed query operator"
                        );
                        continue;
                    }
                    out.insert(key.clone(), self.walk_operators(child, depth + 1, limit)?);
                }
                SanitizableValue::Map(out)
            }
            SanitizableValue::Null | SanitizableValue::Bool(_) | SanitizableValue::Number(_) => {
                value.clone()
            }
        };
        Ok(sanitized)
    }
}

/// Applies `leaf` to every string leaf of `value` using the global policy.
///
/// - arrays keep their length and order
/// - maps keep every key; values under an exempt key (`password`, `token`,
///   `secret`, `apiKey`, `privateKey`) are copied through unmodified
/// - `null`, booleans and numbers are returned unchanged
///
/// Recursion depth is unbounded; see
/// [`SanitizePolicy::sanitize_tree`] for the stack limits.
///
/// # Examples
///
/// ```
/// use sanitize_core::{sanitize_tree, strip_scriptish, SanitizableValue};
/// use serde_json::json;
///
/// let input = SanitizableValue::from(json!({
///     "name": "<b>Ada</b>",
///     "password": "<b>keep me</b>",
///     "bags": 40
/// }));
///
/// let output = sanitize_tree(&input, strip_scriptish);
/// assert_eq!(
///     serde_json::Value::from(output),
///     json!({"name": "Ada", "password": "<b>keep me</b>", "bags": 40})
/// );
/// ```
pub fn sanitize_tree<F>(value: &SanitizableValue, leaf: F) -> SanitizableValue
where
    F: Fn(&str) -> String,
{
    SanitizePolicy::global().sanitize_tree(value, leaf)
}

/// Removes NoSQL operator injection from `value` using the global policy.
///
/// Map keys starting with `$` are dropped unless they are `$and`, `$or`,
/// `$nor` or `$not`; every string leaf goes through
/// [`scrub_sql_patterns`]. Field exemptions do not apply here. Recursion
/// depth is unbounded, as in [`sanitize_tree`].
///
/// # Examples
///
/// ```
/// use sanitize_core::{sanitize_against_nosql_injection, SanitizableValue};
/// use serde_json::json;
///
/// let input = SanitizableValue::from(json!({"filter": {"$where": "this.a==this.b"}}));
/// let output = sanitize_against_nosql_injection(&input);
/// assert_eq!(serde_json::Value::from(output), json!({"filter": {}}));
/// ```
pub fn sanitize_against_nosql_injection(value: &SanitizableValue) -> SanitizableValue {
    SanitizePolicy::global().sanitize_against_nosql_injection(value)
}
