use std::fmt;
use std::sync::Arc;

use crate::markup::{self, StartTag, Token, Tokenizer};
use crate::patterns::{ALLOWED_URI, DANGEROUS_SCHEMES, SQL_PATTERNS, UNSAFE_STYLE};
use crate::SanitizePolicy;

/// Elements whose content the rich-text filter drops on top of the raw-text
/// elements.
const RICH_TEXT_DROPPED_BODIES: &[&str] = &["option"];

/// Attributes holding a URI that must pass the scheme allow-list.
const URI_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "cite", "xlink:href"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkupMode {
    /// Remove every tag, escape stray angle brackets.
    StripAll,
    /// Keep allow-listed tags and attributes, escape the rest.
    RichText,
}

impl MarkupMode {
    /// Raw-text content is never emitted, even escaped, in either mode.
    fn drops_body(self, name: &str) -> bool {
        markup::is_raw_text(name)
            || (self == MarkupMode::RichText && RICH_TEXT_DROPPED_BODIES.contains(&name))
    }

    fn push_text(self, text: &str, out: &mut String) {
        match self {
            MarkupMode::StripAll => {
                for c in text.chars() {
                    match c {
                        '<' => out.push_str("&lt;"),
                        '>' => out.push_str("&gt;"),
                        _ => out.push(c),
                    }
                }
            }
            MarkupMode::RichText => escape_into(text, out, false),
        }
    }
}

impl SanitizePolicy {
    /// Removes every tag from `text`, dropping `<script>` and other raw-text
    /// bodies entirely.
    ///
    /// Comments and declarations are removed too; stray `<` and `>` left in
    /// the text are escaped. See [`strip_scriptish`].
    pub fn strip_scriptish(&self, text: &str) -> String {
        self.filter_markup(text, MarkupMode::StripAll)
    }

    /// Keeps only the allow-listed tags and attributes of `text`.
    ///
    /// See [`sanitize_rich_text`].
    pub fn sanitize_rich_text(&self, text: &str) -> String {
        self.filter_markup(text, MarkupMode::RichText)
    }

    fn filter_markup(&self, input: &str, mode: MarkupMode) -> String {
        if !input.contains(['<', '>', '&']) {
            return input.to_string();
        }

        let mut out = String::with_capacity(input.len());
        // allowed elements awaiting their end tag
        let mut open: Vec<String> = Vec::new();
        // elements whose content is being discarded
        let mut dropping: Vec<String> = Vec::new();

        for token in Tokenizer::new(input) {
            if !dropping.is_empty() {
                match token {
                    Token::StartTag(tag) if mode.drops_body(&tag.name) => {
                        if opens_body(&tag) {
                            dropping.push(tag.name);
                        }
                    }
                    Token::EndTag(name) => {
                        if let Some(pos) = dropping.iter().rposition(|n| *n == name) {
                            dropping.truncate(pos);
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match token {
                Token::Text(text) | Token::RawText(text) => mode.push_text(text, &mut out),
                Token::Comment => {}
                Token::StartTag(tag) => {
                    if mode.drops_body(&tag.name) {
                        if opens_body(&tag) {
                            dropping.push(tag.name);
                        }
                    } else if mode == MarkupMode::RichText && self.allows_tag(&tag.name) {
                        self.push_start_tag(&tag, &mut out);
                        if !markup::is_void(&tag.name) {
                            open.push(tag.name);
                        }
                    }
                }
                Token::EndTag(name) => {
                    if let Some(pos) = open.iter().rposition(|n| *n == name) {
                        for unclosed in open.drain(pos..).rev() {
                            push_end_tag(&unclosed, &mut out);
                        }
                    }
                }
            }
        }

        for unclosed in open.drain(..).rev() {
            push_end_tag(&unclosed, &mut out);
        }
        out
    }

    fn push_start_tag(&self, tag: &StartTag<'_>, out: &mut String) {
        out.push('<');
        out.push_str(&tag.name);
        for attr in &tag.attributes {
            if !self.allows_attribute(&attr.name) {
                continue;
            }
            let raw = attr.value.unwrap_or("");
            if URI_ATTRIBUTES.contains(&attr.name.as_str()) && !is_allowed_uri(raw) {
                continue;
            }
            if attr.name == "style" && UNSAFE_STYLE.is_match(&markup::decode_entities(raw)) {
                continue;
            }
            out.push(' ');
            out.push_str(&attr.name);
            out.push_str("=\"");
            escape_into(raw, out, true);
            out.push('"');
        }
        if markup::is_void(&tag.name) {
            out.push_str(" />");
        } else {
            out.push('>');
        }
    }
}

/// A `<script>` with `/>` still opens a raw-text body; other elements don't.
fn opens_body(tag: &StartTag<'_>) -> bool {
    !tag.self_closing || markup::is_raw_text(&tag.name)
}

fn push_end_tag(name: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn is_allowed_uri(raw: &str) -> bool {
    let decoded: String = markup::decode_entities(raw)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    ALLOWED_URI.is_match(&decoded)
}

/// Escapes markup characters, leaving existing character references alone
/// so that escaping twice is a no-op.
fn escape_into(text: &str, out: &mut String, in_attribute: bool) {
    for (i, c) in text.char_indices() {
        match c {
            '&' if markup::entity_len(&text[i..]).is_none() => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Removes executable markup from a plain-text value.
///
/// Deny-by-default: every tag is removed, the content of `<script>` and the
/// other raw-text elements (`style`, `textarea`, `title`, `xmp`, `iframe`,
/// `noembed`, `noframes`, `noscript`) is dropped rather than left behind as
/// inert text, comments are removed and any remaining `<`/`>` are escaped.
/// Uses the global policy.
///
/// # Examples
///
/// ```
/// use sanitize_core::strip_scriptish;
///
/// assert_eq!(strip_scriptish("<script>alert(1)</script>hello"), "hello");
/// assert_eq!(strip_scriptish("<b>bold</b> & a < b"), "bold & a &lt; b");
/// ```
pub fn strip_scriptish(text: &str) -> String {
    SanitizePolicy::global().strip_scriptish(text)
}

/// Sanitizes a rich-text value against the HTML allow-list.
///
/// Keeps `b, i, em, strong, a, p, br, ul, ol, li, h1-h6, span, div` and the
/// attributes `href, target, rel, class, id, style`. `href` values must use
/// an allowed scheme (`http(s)`, `ftp(s)`, `mailto`, `tel`, `callto`, `cid`,
/// `xmpp`) or be relative. Other tags are removed but their text is kept,
/// except for `option` and the raw-text elements (`script`, `style`,
/// `textarea`, `title`, `xmp`, `iframe`, `noembed`, `noframes`, `noscript`)
/// whose content is dropped. The result is stable under repeated sanitization.
/// Uses the global policy.
///
/// # Examples
///
/// ```
/// use sanitize_core::sanitize_rich_text;
///
/// let html = r#"<p onclick="x()">Hi <a href="javascript:alert(1)">there</a><img src=x></p>"#;
/// assert_eq!(sanitize_rich_text(html), "<p>Hi <a>there</a></p>");
///
/// let once = sanitize_rich_text("<b>1 < 2 & 3</b>");
/// assert_eq!(once, "<b>1 &lt; 2 &amp; 3</b>");
/// assert_eq!(sanitize_rich_text(&once), once);
/// ```
pub fn sanitize_rich_text(text: &str) -> String {
    SanitizePolicy::global().sanitize_rich_text(text)
}

/// Cheap secondary filter for scheme and handler injection.
///
/// Removes `<` and `>`, the prefixes `javascript:`, `vbscript:`, `data:`,
/// `file:` (case-insensitive) and `on<word>=` handler assignments. It is not
/// a replacement for [`strip_scriptish`].
///
/// # Examples
///
/// ```
/// use sanitize_core::strip_dangerous_schemes;
///
/// assert_eq!(strip_dangerous_schemes("JavaScript:alert(1)"), "alert(1)");
/// assert_eq!(strip_dangerous_schemes("<img onerror=go()>"), "img go()");
/// ```
pub fn strip_dangerous_schemes(text: &str) -> String {
    replace_in_sequence(text, &DANGEROUS_SCHEMES)
}

/// Removes SQL injection idioms from a value.
///
/// Passes, applied once each and in this order: the keywords `union`,
/// `select`, `insert`, `update`, `delete`, `drop`, `create`, `alter`,
/// `exec`, `execute` as whole words; `and`/`or` followed by a number and a
/// comparator; `and`/`or` followed by a quoted string and a comparator; the
/// comment markers `--`, `/*`, `*/`; and `;`. Matches are removed. Each pass
/// sees the output of the previous one, but the sweep is not repeated, so
/// a keyword hidden inside another keyword can survive.
///
/// # Examples
///
/// ```
/// use sanitize_core::scrub_sql_patterns;
///
/// assert_eq!(scrub_sql_patterns("1 OR 1=1"), "1 1");
/// assert_eq!(scrub_sql_patterns("x'; DROP TABLE users; --"), "x'  TABLE users ");
/// ```
pub fn scrub_sql_patterns(text: &str) -> String {
    replace_in_sequence(text, &SQL_PATTERNS)
}

fn replace_in_sequence(text: &str, patterns: &[regex::Regex]) -> String {
    let mut current = text.to_string();
    for pattern in patterns {
        current = pattern.replace_all(&current, "").into_owned();
    }
    current
}

/// Leaf transform applied to string values by the tree walkers and the
/// field-scoped sanitizer.
///
/// # Examples
///
/// ```
/// use sanitize_core::{SanitizePolicy, TextFilter};
///
/// let policy = SanitizePolicy::default();
/// let upper = TextFilter::custom(|s| s.to_uppercase());
///
/// assert_eq!(TextFilter::StripScriptish.apply(&policy, "<i>x</i>"), "x");
/// assert_eq!(TextFilter::RichText.apply(&policy, "<i>x</i>"), "<i>x</i>");
/// assert_eq!(upper.apply(&policy, "abc"), "ABC");
/// ```
#[derive(Clone, Default)]
pub enum TextFilter {
    /// [`strip_scriptish`]
    #[default]
    StripScriptish,
    /// [`sanitize_rich_text`]
    RichText,
    /// [`strip_dangerous_schemes`]
    DangerousSchemes,
    /// [`scrub_sql_patterns`]
    SqlPatterns,
    /// Caller-supplied transform
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl TextFilter {
    /// Wraps a closure as a filter.
    pub fn custom(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        TextFilter::Custom(Arc::new(f))
    }

    /// Applies the filter to one string.
    pub fn apply(&self, policy: &SanitizePolicy, text: &str) -> String {
        match self {
            TextFilter::StripScriptish => policy.strip_scriptish(text),
            TextFilter::RichText => policy.sanitize_rich_text(text),
            TextFilter::DangerousSchemes => strip_dangerous_schemes(text),
            TextFilter::SqlPatterns => scrub_sql_patterns(text),
            TextFilter::Custom(f) => f(text),
        }
    }
}

impl fmt::Debug for TextFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextFilter::StripScriptish => write!(f, "StripScriptish"),
            TextFilter::RichText => write!(f, "RichText"),
            TextFilter::DangerousSchemes => write!(f, "DangerousSchemes"),
            TextFilter::SqlPatterns => write!(f, "SqlPatterns"),
            TextFilter::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // strip_scriptish

    #[test]
    fn strips_script_with_body() {
        let out = strip_scriptish("<script>alert(1)</script>hello");

        assert_eq!(out, "hello");
        assert!(!out.contains("alert"));
        assert!(!out.contains("<script"));
    }

    #[test]
    fn strips_all_tags_but_keeps_text() {
        assert_eq!(
            strip_scriptish(r#"<div class="x"><b>bold</b> <i>it</i></div>"#),
            "bold it"
        );
    }

    #[test]
    fn strips_uppercase_and_spaced_script() {
        assert_eq!(strip_scriptish("a<SCRIPT type='x'>evil()</SCRIPT >b"), "ab");
        assert_eq!(strip_scriptish("a<script/>evil()</script>b"), "ab");
    }

    #[test]
    fn drops_unterminated_script_body() {
        assert_eq!(strip_scriptish("safe<script>steal(document.cookie)"), "safe");
    }

    #[test]
    fn removes_event_handler_tags() {
        assert_eq!(strip_scriptish(r#"<img src=x onerror="alert(1)">pic"#), "pic");
    }

    #[test]
    fn escapes_stray_angle_brackets() {
        assert_eq!(strip_scriptish("3 < 4 > 2"), "3 &lt; 4 &gt; 2");
        assert_eq!(strip_scriptish("<b title='x"), "&lt;b title='x");
    }

    #[test]
    fn removes_comments() {
        assert_eq!(strip_scriptish("a<!-- <script>x</script> -->b"), "ab");
    }

    #[test]
    fn drops_style_body() {
        assert_eq!(strip_scriptish("<style>p{}</style>ok"), "ok");
    }

    #[test]
    fn drops_script_nested_in_raw_text_containers() {
        for container in [
            "iframe", "textarea", "title", "noscript", "xmp", "noembed", "noframes", "style",
        ] {
            let input = format!("a<{container}><script>alert(1)</script></{container}>b");

            let out = strip_scriptish(&input);

            assert_eq!(out, "ab", "container: {container}");
            assert!(!out.contains("alert"), "container: {container}");
        }
    }

    #[test]
    fn malformed_tag_does_not_hide_later_script() {
        let out = strip_scriptish("<b title='x>hi<script>alert(1)</script>");

        assert_eq!(out, "&lt;b title='x&gt;hi");
        assert!(!out.contains("alert"));
    }

    #[test]
    fn empty_comments_end_immediately() {
        assert_eq!(strip_scriptish("a<!-->b <i>c</i>"), "ab c");
        assert_eq!(strip_scriptish("a<!--->b"), "ab");
    }

    #[test]
    fn plain_text_is_untouched() {
        let text = "Maize harvest: 40 bags @ ₦12,000 & counting";
        assert_eq!(strip_scriptish(text), text);
    }

    // sanitize_rich_text

    #[test]
    fn keeps_allowed_formatting() {
        let html = r#"<p class="intro">Hello <strong>farmer</strong><br></p>"#;
        assert_eq!(
            sanitize_rich_text(html),
            r#"<p class="intro">Hello <strong>farmer</strong><br /></p>"#
        );
    }

    #[test]
    fn removes_disallowed_tags_keeping_text() {
        assert_eq!(
            sanitize_rich_text("<table><tr><td>cell</td></tr></table>"),
            "cell"
        );
    }

    #[test]
    fn drops_script_and_style_bodies() {
        assert_eq!(
            sanitize_rich_text("<b>bold</b><script>evil()</script><style>b{}</style>"),
            "<b>bold</b>"
        );
    }

    #[test]
    fn drops_script_nested_in_any_raw_text_container() {
        for container in [
            "iframe", "title", "textarea", "noscript", "xmp", "noembed", "noframes", "style",
        ] {
            let input = format!("<b>a</b><{container}><script>alert(1)</script></{container}>b");

            let out = sanitize_rich_text(&input);

            assert_eq!(out, "<b>a</b>b", "container: {container}");
            assert!(!out.contains("alert"), "container: {container}");
        }
    }

    #[test]
    fn malformed_tag_does_not_hide_later_script_in_rich_text() {
        let out = sanitize_rich_text("<b title='x>hi<script>alert(1)</script>");

        assert_eq!(out, "&lt;b title='x&gt;hi");
        assert_eq!(sanitize_rich_text(&out), out);
    }

    #[test]
    fn drops_event_handler_attributes() {
        assert_eq!(
            sanitize_rich_text(r#"<div id="d" onmouseover="x()">t</div>"#),
            r#"<div id="d">t</div>"#
        );
    }

    #[test]
    fn filters_href_schemes() {
        let cases = [
            (r#"<a href="https://example.com">x</a>"#, r#"<a href="https://example.com">x</a>"#),
            (r#"<a href="/market/42">x</a>"#, r#"<a href="/market/42">x</a>"#),
            (r#"<a href="mailto:a@b.co">x</a>"#, r#"<a href="mailto:a@b.co">x</a>"#),
            (r#"<a href="javascript:alert(1)">x</a>"#, "<a>x</a>"),
            (r#"<a href="JaVaScRiPt:alert(1)">x</a>"#, "<a>x</a>"),
            (r#"<a href=" java	script:alert(1)">x</a>"#, "<a>x</a>"),
            (r#"<a href="&#106;avascript:alert(1)">x</a>"#, "<a>x</a>"),
            (r#"<a href="javascript&colon;alert(1)">x</a>"#, "<a>x</a>"),
            (r#"<a href="data:text/html,<script>">x</a>"#, "<a>x</a>"),
            (r#"<a href="vbscript:msgbox">x</a>"#, "<a>x</a>"),
        ];
        for (input, expected) in cases {
            assert_eq!(sanitize_rich_text(input), expected, "input: {input}");
        }
    }

    #[test]
    fn drops_scripted_style() {
        assert_eq!(
            sanitize_rich_text(r#"<span style="width: expression(alert(1))">x</span>"#),
            "<span>x</span>"
        );
        assert_eq!(
            sanitize_rich_text(r#"<span style="color: red">x</span>"#),
            r#"<span style="color: red">x</span>"#
        );
    }

    #[test]
    fn balances_allowed_elements() {
        assert_eq!(sanitize_rich_text("<b>open"), "<b>open</b>");
        assert_eq!(sanitize_rich_text("stray</div>"), "stray");
        assert_eq!(sanitize_rich_text("<p><b>x</p>"), "<p><b>x</b></p>");
    }

    #[test]
    fn escapes_text_without_double_escaping() {
        assert_eq!(sanitize_rich_text("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(sanitize_rich_text("&lt;tag&gt; &amp; &#169;"), "&lt;tag&gt; &amp; &#169;");
    }

    #[test]
    fn escapes_attribute_quotes() {
        assert_eq!(
            sanitize_rich_text(r#"<span title='x' class='say "hi"'>t</span>"#),
            r#"<span class="say &quot;hi&quot;">t</span>"#
        );
    }

    #[test]
    fn rich_text_is_idempotent_on_samples() {
        for input in [
            "<b>bold</b><script>evil()</script>",
            "&am<i>p;</i>",
            "<<b>b>",
            "<a href=x>y",
            "&#106<x>avascript",
            "</p><p/>x<br/>",
            "<option><b>x</b>",
            "a<!--",
            "<a href='&#x6A;avascript:x'>l</a>",
        ] {
            let once = sanitize_rich_text(input);
            assert_eq!(sanitize_rich_text(&once), once, "input: {input}");
        }
    }

    #[test]
    fn custom_policy_allows_extra_tag() {
        let policy = SanitizePolicy::builder().allow_tag("blockquote").build();

        assert_eq!(
            policy.sanitize_rich_text("<blockquote>q</blockquote>"),
            "<blockquote>q</blockquote>"
        );
        assert_eq!(sanitize_rich_text("<blockquote>q</blockquote>"), "q");
    }

    #[test]
    fn allowing_script_still_drops_it() {
        let policy = SanitizePolicy::builder().allow_tag("script").build();

        assert_eq!(policy.sanitize_rich_text("<script>x()</script>ok"), "ok");
    }

    // strip_dangerous_schemes

    #[test]
    fn strips_schemes_case_insensitively() {
        assert_eq!(strip_dangerous_schemes("VBScript:run"), "run");
        assert_eq!(strip_dangerous_schemes("DATA:text/html"), "text/html");
        assert_eq!(strip_dangerous_schemes("file:///etc/passwd"), "///etc/passwd");
    }

    #[test]
    fn strips_handlers_and_brackets() {
        assert_eq!(strip_dangerous_schemes("onClick = steal()"), " steal()");
        assert_eq!(strip_dangerous_schemes("a<b>c"), "abc");
    }

    #[test]
    fn leaves_ordinary_text() {
        assert_eq!(strip_dangerous_schemes("one two"), "one two");
    }

    // scrub_sql_patterns

    #[test]
    fn removes_boolean_injection() {
        let out = scrub_sql_patterns("1 OR 1=1");

        assert_eq!(out, "1 1");
        assert!(!out.to_lowercase().contains("or"));
    }

    #[test]
    fn removes_quoted_boolean_injection() {
        assert_eq!(scrub_sql_patterns("admin' or 'a'='a"), "admin' 'a");
    }

    #[test]
    fn removes_keywords_as_whole_words_only() {
        assert_eq!(scrub_sql_patterns("UNION SELECT name"), "  name");
        assert_eq!(scrub_sql_patterns("selection reunion"), "selection reunion");
    }

    #[test]
    fn removes_comment_markers_and_semicolons() {
        assert_eq!(scrub_sql_patterns("a -- b /* c */ d; e"), "a  b  c  d e");
    }

    #[test]
    fn single_sweep_leaves_nested_keyword() {
        // one pass: the inner "union" has no word boundary and survives
        assert_eq!(scrub_sql_patterns("uniunionon select"), "uniunionon ");
    }

    #[test]
    fn later_pass_sees_earlier_output() {
        // removing the keyword exposes "or 1=" to the boolean pass
        assert_eq!(scrub_sql_patterns("x or select 1=1"), "x 1");
    }

    #[test]
    fn text_filter_debug() {
        assert_eq!(format!("{:?}", TextFilter::default()), "StripScriptish");
        assert_eq!(format!("{:?}", TextFilter::custom(|s| s.to_string())), "Custom(..)");
    }

    mod proptests {
        use super::*;
        use crate::test_utils::arb_markup;
        use proptest::prelude::*;

        proptest! {
            /// Property: rich text is a fixed point after one pass
            #[test]
            fn proptest_rich_text_idempotent(input in arb_markup()) {
                let once = sanitize_rich_text(&input);

                prop_assert_eq!(sanitize_rich_text(&once), once);
            }

            /// Property: stripped text is a fixed point and holds no tags
            #[test]
            fn proptest_strip_idempotent_and_tag_free(input in arb_markup()) {
                let once = strip_scriptish(&input);

                prop_assert!(!once.contains('<'));
                prop_assert!(!once.contains('>'));
                prop_assert_eq!(strip_scriptish(&once), once);
            }

            /// Property: no script element survives either filter
            #[test]
            fn proptest_no_script_survives(input in arb_markup()) {
                prop_assert!(!sanitize_rich_text(&input).to_lowercase().contains("<script"));
                let stripped = strip_scriptish(&input).to_lowercase();
                prop_assert!(!stripped.contains("script>"));
                prop_assert!(!stripped.contains("&lt;script"));
            }

            /// Property: text without markup characters passes unchanged
            #[test]
            fn proptest_plain_text_untouched(input in "[a-zA-Z0-9 .,!?]{0,64}") {
                prop_assert_eq!(strip_scriptish(&input), input.clone());
                prop_assert_eq!(sanitize_rich_text(&input), input);
            }
        }
    }
}
