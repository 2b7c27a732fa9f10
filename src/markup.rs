//! Minimal HTML tokenizer for the markup filters.
//!
//! This is not a conforming HTML5 parser. It recognizes just enough
//! structure (tags, attributes, comments, raw-text elements) to decide what
//! to keep. A `<` that does not open well-formed markup is reported as text,
//! which the filters then escape, and scanning resumes right after it.

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// Elements that never have content or an end tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub(crate) fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

pub(crate) fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Character data between tags.
    Text(&'a str),
    /// Content of a raw-text element such as `<script>`.
    RawText(&'a str),
    StartTag(StartTag<'a>),
    /// End tag with its lower-cased name.
    EndTag(String),
    /// Comment, doctype or processing instruction.
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartTag<'a> {
    /// Lower-cased tag name.
    pub name: String,
    pub attributes: Vec<Attribute<'a>>,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attribute<'a> {
    /// Lower-cased attribute name.
    pub name: String,
    /// Raw value, entities still encoded. `None` for a bare attribute.
    pub value: Option<&'a str>,
}

pub(crate) struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    raw_text_of: Option<String>,
}

impl<'a> Tokenizer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_text_of: None,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn take_rest_as_text(&mut self) -> Token<'a> {
        let text = self.rest();
        self.pos = self.input.len();
        Token::Text(text)
    }

    /// Scans raw text until `</name` followed by a delimiter.
    fn raw_text(&mut self, name: &str) -> Token<'a> {
        let bytes = self.bytes();
        let start = self.pos;
        let mut i = start;
        while i + 1 < bytes.len() {
            if bytes[i] == b'<' && bytes[i + 1] == b'/' {
                let name_end = i + 2 + name.len();
                if name_end <= bytes.len()
                    && bytes[i + 2..name_end].eq_ignore_ascii_case(name.as_bytes())
                    && bytes
                        .get(name_end)
                        .map_or(true, |b| is_space(*b) || *b == b'/' || *b == b'>')
                {
                    self.pos = i;
                    return Token::RawText(&self.input[start..i]);
                }
            }
            i += 1;
        }
        self.pos = bytes.len();
        Token::RawText(&self.input[start..])
    }

    fn comment(&mut self) -> Token<'a> {
        let rest = self.rest();
        let consumed = if let Some(body) = rest.strip_prefix("<!--") {
            // `<!-->` and `<!--->` are complete empty comments
            if body.starts_with('>') {
                5
            } else if body.starts_with("->") {
                6
            } else {
                body.find("-->").map_or(rest.len(), |end| 4 + end + 3)
            }
        } else {
            rest.find('>').map_or(rest.len(), |end| end + 1)
        };
        self.pos += consumed;
        Token::Comment
    }

    fn end_tag(&mut self) -> Token<'a> {
        let bytes = self.bytes();
        let name_start = self.pos + 2;
        let mut i = name_start;
        while i < bytes.len() && !is_space(bytes[i]) && bytes[i] != b'/' && bytes[i] != b'>' {
            i += 1;
        }
        let name = self.input[name_start..i].to_ascii_lowercase();
        match self.input[i..].find('>') {
            Some(offset) => {
                self.pos = i + offset + 1;
                Token::EndTag(name)
            }
            None => self.take_rest_as_text(),
        }
    }

    fn start_tag(&mut self) -> Option<StartTag<'a>> {
        let bytes = self.bytes();
        let input = self.input;
        let name_start = self.pos + 1;
        let mut i = name_start;
        while i < bytes.len() && !is_space(bytes[i]) && bytes[i] != b'/' && bytes[i] != b'>' {
            i += 1;
        }
        let name = input[name_start..i].to_ascii_lowercase();
        let mut attributes: Vec<Attribute<'a>> = Vec::new();
        let mut self_closing = false;

        loop {
            while i < bytes.len() && (is_space(bytes[i]) || bytes[i] == b'/') {
                self_closing = bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>');
                i += 1;
            }
            if i >= bytes.len() {
                return None;
            }
            if bytes[i] == b'>' {
                i += 1;
                break;
            }
            self_closing = false;

            let attr_start = i;
            if bytes[i] == b'=' {
                i += 1;
            }
            while i < bytes.len()
                && !is_space(bytes[i])
                && bytes[i] != b'/'
                && bytes[i] != b'>'
                && bytes[i] != b'='
            {
                i += 1;
            }
            let attr_name = input[attr_start..i].to_ascii_lowercase();

            while i < bytes.len() && is_space(bytes[i]) {
                i += 1;
            }
            let mut value = None;
            if i < bytes.len() && bytes[i] == b'=' {
                i += 1;
                while i < bytes.len() && is_space(bytes[i]) {
                    i += 1;
                }
                if i >= bytes.len() {
                    return None;
                }
                let quote = bytes[i];
                if quote == b'"' || quote == b'\'' {
                    let value_start = i + 1;
                    let close = input[value_start..].find(quote as char)?;
                    value = Some(&input[value_start..value_start + close]);
                    i = value_start + close + 1;
                } else {
                    let value_start = i;
                    while i < bytes.len() && !is_space(bytes[i]) && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = Some(&input[value_start..i]);
                }
            }

            if !attributes.iter().any(|a| a.name == attr_name) {
                attributes.push(Attribute {
                    name: attr_name,
                    value,
                });
            }
        }

        self.pos = i;
        Some(StartTag {
            name,
            attributes,
            self_closing,
        })
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if let Some(name) = self.raw_text_of.take() {
            if self.pos < self.input.len() {
                return Some(self.raw_text(&name));
            }
        }
        if self.pos >= self.input.len() {
            return None;
        }

        let rest = self.rest();
        let Some(lt) = rest.find('<') else {
            return Some(self.take_rest_as_text());
        };
        if lt > 0 {
            self.pos += lt;
            return Some(Token::Text(&rest[..lt]));
        }

        let next = rest.as_bytes().get(1).copied();
        let token = match next {
            Some(b'!') | Some(b'?') => self.comment(),
            Some(b'/') => match rest.as_bytes().get(2).copied() {
                Some(b) if b.is_ascii_alphabetic() => self.end_tag(),
                Some(_) => self.comment(),
                None => self.take_rest_as_text(),
            },
            Some(b) if b.is_ascii_alphabetic() => match self.start_tag() {
                Some(tag) => {
                    if is_raw_text(&tag.name) {
                        self.raw_text_of = Some(tag.name.clone());
                    }
                    Token::StartTag(tag)
                }
                None => {
                    self.pos += 1;
                    Token::Text("<")
                }
            },
            _ => {
                self.pos += 1;
                Token::Text("<")
            }
        };
        Some(token)
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0c')
}

/// Returns the byte length of the character reference at the start of `s`
/// (which begins with `&`), or `None` if it is a bare ampersand.
///
/// Numeric references may omit the trailing `;`, as browsers accept them
/// that way. Named references need it.
pub(crate) fn entity_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }
    if bytes.get(1) == Some(&b'#') {
        let (digits_start, is_digit): (usize, fn(&u8) -> bool) = match bytes.get(2) {
            Some(b'x') | Some(b'X') => (3, u8::is_ascii_hexdigit),
            _ => (2, u8::is_ascii_digit),
        };
        let digits = bytes[digits_start..]
            .iter()
            .take_while(|b| is_digit(*b))
            .count();
        if digits == 0 {
            return None;
        }
        let end = digits_start + digits;
        return Some(if bytes.get(end) == Some(&b';') { end + 1 } else { end });
    }
    if !bytes.get(1).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    let name_len = bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    (bytes.get(1 + name_len) == Some(&b';')).then_some(name_len + 2)
}

/// Decodes character references well enough to judge a URI's scheme.
pub(crate) fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while let Some(offset) = s[i..].find('&') {
        out.push_str(&s[i..i + offset]);
        i += offset;
        match entity_len(&s[i..]) {
            Some(len) => {
                let reference = &s[i..i + len];
                match decode_reference(reference) {
                    Some(c) => out.push(c),
                    None => out.push_str(reference),
                }
                i += len;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    out.push_str(&s[i..]);
    out
}

fn decode_reference(reference: &str) -> Option<char> {
    let body = reference.trim_start_matches('&').trim_end_matches(';');
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code).or(Some('\u{FFFD}'));
    }
    let c = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "colon" => ':',
        "Tab" => '\t',
        "NewLine" => '\n',
        "nbsp" => '\u{A0}',
        "sol" => '/',
        "lpar" => '(',
        "rpar" => ')',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        Tokenizer::new(input).collect()
    }

    #[test]
    fn text_only() {
        assert_eq!(tokens("hello"), vec![Token::Text("hello")]);
    }

    #[test]
    fn start_and_end_tags() {
        let toks = tokens("<B class='x'>hi</B >");
        assert_eq!(toks.len(), 3);
        match &toks[0] {
            Token::StartTag(tag) => {
                assert_eq!(tag.name, "b");
                assert_eq!(tag.attributes[0].name, "class");
                assert_eq!(tag.attributes[0].value, Some("x"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(toks[1], Token::Text("hi"));
        assert_eq!(toks[2], Token::EndTag("b".to_string()));
    }

    #[test]
    fn script_content_is_raw_text() {
        let toks = tokens("<script>if (a < b) { x('</b>') }</script>after");
        assert_eq!(toks[1], Token::RawText("if (a < b) { x('</b>') }"));
        assert_eq!(toks[2], Token::EndTag("script".to_string()));
        assert_eq!(toks[3], Token::Text("after"));
    }

    #[test]
    fn unterminated_raw_text_runs_to_end() {
        let toks = tokens("<script>alert(1)");
        assert_eq!(toks[1], Token::RawText("alert(1)"));
        assert_eq!(toks.len(), 2);
    }

    #[test]
    fn comments_and_doctype() {
        let toks = tokens("a<!-- <b>hidden</b> -->b<!DOCTYPE html>c<?xml?>d");
        assert_eq!(
            toks,
            vec![
                Token::Text("a"),
                Token::Comment,
                Token::Text("b"),
                Token::Comment,
                Token::Text("c"),
                Token::Comment,
                Token::Text("d"),
            ]
        );
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        assert_eq!(
            tokens("a < b"),
            vec![Token::Text("a "), Token::Text("<"), Token::Text(" b")]
        );
    }

    #[test]
    fn unterminated_tag_is_text() {
        assert_eq!(
            tokens("x<b title='y"),
            vec![Token::Text("x"), Token::Text("<"), Token::Text("b title='y")]
        );
    }

    #[test]
    fn scanning_resumes_after_malformed_tag() {
        let toks = tokens("<b title='x>hi<script>alert(1)</script>");

        assert_eq!(toks[0], Token::Text("<"));
        assert_eq!(toks[1], Token::Text("b title='x>hi"));
        assert!(matches!(&toks[2], Token::StartTag(tag) if tag.name == "script"));
        assert_eq!(toks[3], Token::RawText("alert(1)"));
        assert_eq!(toks[4], Token::EndTag("script".to_string()));
    }

    #[test]
    fn empty_comments() {
        assert_eq!(
            tokens("a<!-->b<!--->c"),
            vec![
                Token::Text("a"),
                Token::Comment,
                Token::Text("b"),
                Token::Comment,
                Token::Text("c"),
            ]
        );
    }

    #[test]
    fn self_closing_and_bare_attributes() {
        match &tokens("<br/>")[0] {
            Token::StartTag(tag) => assert!(tag.self_closing),
            other => panic!("unexpected {other:?}"),
        }
        match &tokens("<input disabled value=a>")[0] {
            Token::StartTag(tag) => {
                assert_eq!(tag.attributes[0].value, None);
                assert_eq!(tag.attributes[1].value, Some("a"));
                assert!(!tag.self_closing);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn duplicate_attributes_keep_first() {
        match &tokens("<a href='/one' HREF='/two'>")[0] {
            Token::StartTag(tag) => {
                assert_eq!(tag.attributes.len(), 1);
                assert_eq!(tag.attributes[0].value, Some("/one"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn entity_lengths() {
        assert_eq!(entity_len("&amp;x"), Some(5));
        assert_eq!(entity_len("&#106;"), Some(6));
        assert_eq!(entity_len("&#106avascript"), Some(5));
        assert_eq!(entity_len("&#x6A;"), Some(6));
        assert_eq!(entity_len("&amp"), None);
        assert_eq!(entity_len("& b"), None);
        assert_eq!(entity_len("&#;"), None);
    }

    #[test]
    fn decodes_scheme_obfuscation() {
        assert_eq!(decode_entities("&#106;avascript&colon;x"), "javascript:x");
        assert_eq!(decode_entities("&#x6A;ava&Tab;script:"), "java\tscript:");
        assert_eq!(decode_entities("a & b &unknown;"), "a & b &unknown;");
    }
}
