//! Small, forgiving HTML tokenizer for server-rendered documents.
//!
//! Supported tag and attribute name characters (ASCII only): `[A-Za-z0-9:_-]`, plus `.` and `@`
//! in attribute names for framework-style directives. Names are lower-cased.
//!
//! Known limitations (intentional):
//! - Not an HTML5 state machine; no parse-error recovery beyond skipping stray bytes.
//! - Raw text is recognized for `script` and `style` only; `textarea`/`title` bodies are
//!   tokenized like ordinary content.
//! - Raw text close-tag scanning accepts only ASCII whitespace before `>`.
use crate::entities::decode_entities;
use crate::types::{Attributes, Token};
use memchr::memchr;

const HTML_COMMENT_START: &str = "<!--";
const HTML_COMMENT_END: &str = "-->";

// Only ever matched at an ASCII `<`, which cannot be a UTF-8 continuation byte.
const SCRIPT_CLOSE_TAG: &[u8] = b"</script";
const STYLE_CLOSE_TAG: &[u8] = b"</style";

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

fn find_rawtext_close_tag(haystack: &str, close_tag: &[u8]) -> Option<(usize, usize)> {
    let bytes = haystack.as_bytes();
    let len = bytes.len();
    let n = close_tag.len();
    let mut i = 0;
    while i + n <= len {
        i += memchr(b'<', &bytes[i..])?;
        if i + n > len {
            return None;
        }
        if starts_with_ignore_ascii_case_at(bytes, i, close_tag) {
            let mut k = i + n;
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < len && bytes[k] == b'>' {
                return Some((i, k + 1));
            }
        }
        i += 1;
    }
    None
}

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_tag_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn is_attr_name_byte(b: u8) -> bool {
    is_tag_name_byte(b) || b == b'.' || b == b'@'
}

pub fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::new(input).run()
}

pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    out: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            out: Vec::new(),
        }
    }

    pub fn run(mut self) -> Vec<Token> {
        let bytes = self.input.as_bytes();
        // Slices are only ever cut at ASCII structural bytes, so every endpoint stays on a
        // UTF-8 char boundary.
        while self.pos < bytes.len() {
            if bytes[self.pos] != b'<' {
                self.text_run();
                continue;
            }
            let rest = &self.input[self.pos..];
            if rest.starts_with(HTML_COMMENT_START) {
                self.comment();
            } else if starts_with_ignore_ascii_case_at(bytes, self.pos, b"<!doctype") {
                if !self.doctype() {
                    break;
                }
            } else if bytes.get(self.pos + 1) == Some(&b'/') {
                self.end_tag();
            } else if bytes.get(self.pos + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
                if !self.start_tag() {
                    break;
                }
            } else if bytes.get(self.pos + 1).is_some_and(|b| *b == b'!' || *b == b'?') {
                // Bogus markup declaration or processing instruction: drop it.
                match memchr(b'>', &bytes[self.pos..]) {
                    Some(end) => self.pos += end + 1,
                    None => break,
                }
            } else {
                // A lone `<` is text.
                self.push_text("<");
                self.pos += 1;
            }
        }
        self.out
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        // Merge with a preceding text token so stray `<` does not split text nodes.
        if let Some(Token::Text(prev)) = self.out.last_mut() {
            prev.push_str(text);
            return;
        }
        self.out.push(Token::Text(text.to_string()));
    }

    fn text_run(&mut self) {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        let end = memchr(b'<', &bytes[start..]).map_or(bytes.len(), |rel| start + rel);
        let decoded = decode_entities(&self.input[start..end]);
        self.push_text(&decoded);
        self.pos = end;
    }

    fn comment(&mut self) {
        let body_start = self.pos + HTML_COMMENT_START.len();
        match self.input[body_start..].find(HTML_COMMENT_END) {
            Some(end) => {
                let text = &self.input[body_start..body_start + end];
                self.out.push(Token::Comment(text.to_string()));
                self.pos = body_start + end + HTML_COMMENT_END.len();
            }
            None => {
                self.out
                    .push(Token::Comment(self.input[body_start..].to_string()));
                self.pos = self.input.len();
            }
        }
    }

    fn doctype(&mut self) -> bool {
        let rest = &self.input[self.pos + 2..];
        let Some(end) = rest.find('>') else {
            return false;
        };
        // Keep the declaration minus the `DOCTYPE` keyword, e.g. `html`.
        let declaration = rest[..end].trim();
        let value = declaration
            .get(7..)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        self.out.push(Token::Doctype(value));
        self.pos += 2 + end + 1;
        true
    }

    fn end_tag(&mut self) {
        let bytes = self.input.as_bytes();
        let start = self.pos + 2;
        let mut j = start;
        while j < bytes.len() && is_tag_name_byte(bytes[j]) {
            j += 1;
        }
        let name = self.input[start..j].to_ascii_lowercase();
        j = memchr(b'>', &bytes[j..]).map_or(bytes.len(), |rel| j + rel + 1);
        if !name.is_empty() {
            self.out.push(Token::EndTag(name));
        }
        self.pos = j;
    }

    fn start_tag(&mut self) -> bool {
        let bytes = self.input.as_bytes();
        let len = bytes.len();
        let start = self.pos + 1;
        let mut k = start;
        while k < len && is_tag_name_byte(bytes[k]) {
            k += 1;
        }
        let name = self.input[start..k].to_ascii_lowercase();
        let mut attributes: Attributes = Vec::new();
        let mut self_closing = false;

        loop {
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k >= len {
                break;
            }
            if bytes[k] == b'>' {
                k += 1;
                break;
            }
            if bytes[k] == b'/' {
                if k + 1 < len && bytes[k + 1] == b'>' {
                    self_closing = true;
                    k += 2;
                    break;
                }
                k += 1;
                continue;
            }
            let name_start = k;
            while k < len && is_attr_name_byte(bytes[k]) {
                k += 1;
            }
            if name_start == k {
                k += 1;
                continue;
            }
            let attribute_name = self.input[name_start..k].to_ascii_lowercase();
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            let mut value = None;
            if k < len && bytes[k] == b'=' {
                k += 1;
                while k < len && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k < len && (bytes[k] == b'"' || bytes[k] == b'\'') {
                    let quote = bytes[k];
                    k += 1;
                    let value_start = k;
                    k = memchr(quote, &bytes[k..]).map_or(len, |rel| k + rel);
                    value = Some(decode_entities(&self.input[value_start..k]));
                    if k < len {
                        k += 1;
                    }
                } else {
                    let value_start = k;
                    while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                        if bytes[k] == b'/' && k + 1 < len && bytes[k + 1] == b'>' {
                            break;
                        }
                        k += 1;
                    }
                    value = Some(decode_entities(&self.input[value_start..k]));
                }
            }
            // Duplicate attributes: the first occurrence wins.
            if !attributes.iter().any(|(n, _)| *n == attribute_name) {
                attributes.push((attribute_name, value));
            }
        }

        if is_void_element(&name) {
            self_closing = true;
        }
        let rawtext = !self_closing && (name == "script" || name == "style");
        self.out.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });
        self.pos = k;

        if rawtext {
            let close_tag = if name == "script" {
                SCRIPT_CLOSE_TAG
            } else {
                STYLE_CLOSE_TAG
            };
            let body = &self.input[self.pos..];
            match find_rawtext_close_tag(body, close_tag) {
                Some((rel_start, rel_end)) => {
                    if rel_start > 0 {
                        self.out.push(Token::Text(body[..rel_start].to_string()));
                    }
                    self.out.push(Token::EndTag(name));
                    self.pos += rel_end;
                }
                None => {
                    // Missing close tag: the remainder is raw text and the element closes
                    // implicitly at end of input.
                    if !body.is_empty() {
                        self.out.push(Token::Text(body.to_string()));
                    }
                    self.out.push(Token::EndTag(name));
                    return false;
                }
            }
        }
        true
    }
}
