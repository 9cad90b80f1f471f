//! Scene markup reader.
//!
//! Scenes are written as a small subset of HTML/XML:
//!
//! ```text
//! <scene width="1080" height="1920">
//!   <asset id="hero" src="hero.png"></asset>
//!   <entity id="player" position="appWidth/2 200" sprite="src: #hero"></entity>
//! </scene>
//! ```
//!
//! Supported: elements, quoted/unquoted/bare attributes, self-closing tags,
//! comments, `<!DOCTYPE ...>` and `<?...?>` declarations, and the usual
//! character references inside attribute values. Text content is skipped.
//! Tag and attribute names are lowercased, as an HTML parser would.

use crate::error::SceneError;

/// One element of the markup tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    /// Attributes in source order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub line: usize,
    pub col: usize,
}

impl Element {
    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if this element's tag matches (case-insensitive).
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Depth-first search for the first element with the given tag,
    /// starting with `self`.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        if self.is(tag) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(tag))
    }

    /// Collect every descendant (and `self`) with the given tag, in document
    /// order.
    pub fn find_all<'a>(&'a self, tag: &str, out: &mut Vec<&'a Element>) {
        if self.is(tag) {
            out.push(self);
        }
        for child in &self.children {
            child.find_all(tag, out);
        }
    }
}

/// A parsed markup source: zero or more top-level elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub roots: Vec<Element>,
}

impl Document {
    /// Parse a markup string.
    pub fn parse(input: &str) -> Result<Self, SceneError> {
        let mut reader = Reader::new(input);
        let roots = reader.content(None)?;
        Ok(Self { roots })
    }

    /// First element with the given tag anywhere in the document.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.roots.iter().find_map(|r| r.find(tag))
    }
}

struct Reader<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> SceneError {
        SceneError::Markup {
            line: self.line,
            col: self.col,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn bump(&mut self) {
        if let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'\n' {
                self.line += 1;
                self.col = 1;
            } else if b & 0xC0 != 0x80 {
                // Count characters, not UTF-8 continuation bytes.
                self.col += 1;
            }
        }
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.bump();
        }
    }

    fn skip_until(&mut self, terminator: &str, what: &str) -> Result<(), SceneError> {
        while self.pos < self.bytes.len() {
            if self.starts_with(terminator) {
                self.bump_n(terminator.len());
                return Ok(());
            }
            self.bump();
        }
        Err(self.error(format!("unterminated {what}")))
    }

    /// Read sibling nodes until the closing tag of `parent` (or end of input
    /// at top level).
    fn content(&mut self, parent: Option<&str>) -> Result<Vec<Element>, SceneError> {
        let mut elements = Vec::new();
        loop {
            // Text content is not meaningful to scenes.
            while let Some(b) = self.peek() {
                if b == b'<' {
                    break;
                }
                self.bump();
            }

            if self.peek().is_none() {
                return match parent {
                    Some(tag) => Err(self.error(format!("unclosed <{tag}>"))),
                    None => Ok(elements),
                };
            }

            if self.starts_with("<!--") {
                self.bump_n(4);
                self.skip_until("-->", "comment")?;
            } else if self.starts_with("<!") || self.starts_with("<?") {
                self.skip_until(">", "declaration")?;
            } else if self.starts_with("</") {
                self.bump_n(2);
                let name = self.name()?;
                self.skip_whitespace();
                if self.peek() != Some(b'>') {
                    return Err(self.error(format!("expected > after </{name}")));
                }
                self.bump();
                return match parent {
                    Some(tag) if tag == name => Ok(elements),
                    Some(tag) => Err(self.error(format!("expected </{tag}>, got </{name}>"))),
                    None => Err(self.error(format!("unexpected </{name}>"))),
                };
            } else {
                elements.push(self.element()?);
            }
        }
    }

    fn element(&mut self) -> Result<Element, SceneError> {
        let (line, col) = (self.line, self.col);
        self.bump(); // '<'
        let tag = self.name()?;
        let mut attributes: Vec<(String, String)> = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'>') => {
                    self.bump();
                    let children = self.content(Some(&tag))?;
                    return Ok(Element {
                        tag,
                        attributes,
                        children,
                        line,
                        col,
                    });
                }
                Some(b'/') => {
                    self.bump();
                    if self.peek() != Some(b'>') {
                        return Err(self.error("expected > after /"));
                    }
                    self.bump();
                    return Ok(Element {
                        tag,
                        attributes,
                        children: Vec::new(),
                        line,
                        col,
                    });
                }
                Some(_) => {
                    let (name, value) = self.attribute()?;
                    // Like the DOM, the first declaration of a name wins.
                    if !attributes.iter().any(|(k, _)| *k == name) {
                        attributes.push((name, value));
                    }
                }
                None => return Err(self.error(format!("unterminated <{tag}"))),
            }
        }
    }

    fn name(&mut self) -> Result<String, SceneError> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.') {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(self.input[start..self.pos].to_ascii_lowercase())
    }

    fn attribute(&mut self) -> Result<(String, String), SceneError> {
        let name = self.name()?;
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            return Ok((name, String::new()));
        }
        self.bump();
        self.skip_whitespace();

        let raw = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.bump();
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if b == quote {
                        break;
                    }
                    self.bump();
                }
                if self.peek().is_none() {
                    return Err(self.error(format!("unterminated value for '{name}'")));
                }
                let raw = &self.input[start..self.pos];
                self.bump();
                raw
            }
            Some(_) => {
                let start = self.pos;
                while let Some(b) = self.peek() {
                    if matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'>') {
                        break;
                    }
                    if b == b'/' && self.bytes.get(self.pos + 1) == Some(&b'>') {
                        break;
                    }
                    self.bump();
                }
                &self.input[start..self.pos]
            }
            None => return Err(self.error(format!("missing value for '{name}'"))),
        };

        Ok((name, decode_entities(raw)))
    }
}

/// Replace character references (`&amp;`, `&#38;`, `&#x26;`, ...).
/// Unknown references are kept verbatim.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let name = &rest[1..semi];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => name
                    .strip_prefix("#x")
                    .or_else(|| name.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
