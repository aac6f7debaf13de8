//! Tree builder on top of the lexer.
//!
//! Two flavours: `parse` forgives what browsers forgive (stray closing tags,
//! unclosed elements), `parse_strict` rejects both and is used by the test
//! notations where a typo should fail loudly.

use crate::error::{MarkupError, MarkupResult};
use crate::escape::{decode_entities, escape_attribute};
use crate::lexer::{lex, Token};

/// Elements that never have children or a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Parsed markup node
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element {
        name: String,
        /// Attributes in source order
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

impl MarkupNode {
    pub fn name(&self) -> Option<&str> {
        match self {
            MarkupNode::Element { name, .. } => Some(name),
            MarkupNode::Text(_) => None,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            MarkupNode::Element { attributes, .. } => attributes
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str()),
            MarkupNode::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[MarkupNode] {
        match self {
            MarkupNode::Element { children, .. } => children,
            MarkupNode::Text(_) => &[],
        }
    }
}

struct OpenElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<MarkupNode>,
}

struct TreeBuilder {
    strict: bool,
    roots: Vec<MarkupNode>,
    stack: Vec<OpenElement>,
}

impl TreeBuilder {
    fn new(strict: bool) -> Self {
        Self {
            strict,
            roots: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn push_node(&mut self, node: MarkupNode) {
        let target = match self.stack.last_mut() {
            Some(open) => &mut open.children,
            None => &mut self.roots,
        };

        // Text split by comments or error tokens joins back up
        if let (MarkupNode::Text(new_text), Some(MarkupNode::Text(last))) = (&node, target.last_mut()) {
            last.push_str(new_text);
            return;
        }

        target.push(node);
    }

    fn open(&mut self, pos: usize, slice: &str) -> MarkupResult<()> {
        let tag = parse_tag(pos, slice)?;
        let is_void = VOID_ELEMENTS.contains(&tag.name.as_str());

        if tag.self_closing || is_void {
            self.push_node(MarkupNode::Element {
                name: tag.name,
                attributes: tag.attributes,
                children: Vec::new(),
            });
        } else {
            self.stack.push(OpenElement {
                name: tag.name,
                attributes: tag.attributes,
                children: Vec::new(),
            });
        }

        Ok(())
    }

    fn close(&mut self, pos: usize, slice: &str) -> MarkupResult<()> {
        let name = slice
            .trim_start_matches("</")
            .trim_end_matches('>')
            .trim()
            .to_string();

        if VOID_ELEMENTS.contains(&name.as_str()) {
            return Ok(());
        }

        let Some(depth) = self.stack.iter().rposition(|open| open.name == name) else {
            if self.strict {
                return Err(MarkupError::unexpected_closing_tag(pos, name));
            }
            return Ok(());
        };

        if self.strict && depth != self.stack.len() - 1 {
            return Err(MarkupError::unexpected_closing_tag(pos, name));
        }

        while self.stack.len() > depth {
            self.pop();
        }

        Ok(())
    }

    fn pop(&mut self) {
        if let Some(open) = self.stack.pop() {
            self.push_node(MarkupNode::Element {
                name: open.name,
                attributes: open.attributes,
                children: open.children,
            });
        }
    }

    fn finish(mut self) -> MarkupResult<Vec<MarkupNode>> {
        if self.strict {
            if let Some(open) = self.stack.last() {
                return Err(MarkupError::UnclosedTag {
                    name: open.name.clone(),
                });
            }
        }

        while !self.stack.is_empty() {
            self.pop();
        }

        Ok(self.roots)
    }
}

struct ParsedTag {
    name: String,
    attributes: Vec<(String, String)>,
    self_closing: bool,
}

fn parse_tag(pos: usize, slice: &str) -> MarkupResult<ParsedTag> {
    let inner = slice
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .ok_or_else(|| MarkupError::invalid_tag(pos, "tag is not delimited"))?;

    let (inner, self_closing) = match inner.trim_end().strip_suffix('/') {
        Some(stripped) => (stripped, true),
        None => (inner, false),
    };

    let chars: Vec<char> = inner.chars().collect();
    let mut i = 0;

    let name: String = chars
        .iter()
        .take_while(|c| !c.is_whitespace())
        .collect();
    i += name.chars().count();

    if name.is_empty() {
        return Err(MarkupError::invalid_tag(pos, "missing tag name"));
    }

    let mut attributes = Vec::new();

    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '=' {
            i += 1;
        }
        let key: String = chars[start..i].iter().collect();

        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }

        if i < chars.len() && chars[i] == '=' {
            i += 1;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }

            let value: String = match chars.get(i) {
                Some(&quote) if quote == '"' || quote == '\'' => {
                    i += 1;
                    let value_start = i;
                    while i < chars.len() && chars[i] != quote {
                        i += 1;
                    }
                    if i >= chars.len() {
                        return Err(MarkupError::invalid_tag(pos, "unterminated attribute value"));
                    }
                    let value = chars[value_start..i].iter().collect();
                    i += 1;
                    value
                }
                _ => {
                    let value_start = i;
                    while i < chars.len() && !chars[i].is_whitespace() {
                        i += 1;
                    }
                    chars[value_start..i].iter().collect()
                }
            };

            attributes.push((key, decode_entities(&value)));
        } else {
            attributes.push((key, String::new()));
        }
    }

    Ok(ParsedTag {
        name,
        attributes,
        self_closing,
    })
}

fn build(source: &str, strict: bool) -> MarkupResult<Vec<MarkupNode>> {
    let mut builder = TreeBuilder::new(strict);

    for result in lex(source) {
        match result {
            Ok(spanned) => match spanned.token {
                Token::OpenTag(slice) => builder.open(spanned.span.start, slice)?,
                Token::CloseTag(slice) => builder.close(spanned.span.start, slice)?,
                Token::Text(text) => builder.push_node(MarkupNode::Text(decode_entities(text))),
                Token::Comment(_) | Token::Doctype(_) => {}
            },
            Err(span) => {
                builder.push_node(MarkupNode::Text(source[span.start..span.end].to_string()));
            }
        }
    }

    builder.finish()
}

/// Parse markup the way a browser would tolerate it
pub fn parse(source: &str) -> MarkupResult<Vec<MarkupNode>> {
    build(source, false)
}

/// Parse markup, rejecting mismatched or unclosed tags
pub fn parse_strict(source: &str) -> MarkupResult<Vec<MarkupNode>> {
    build(source, true)
}

/// Write `<name a="b">` (or `<name a="b"/>`) into `out`
pub fn write_start_tag<'a>(
    out: &mut String,
    name: &str,
    attributes: impl IntoIterator<Item = (&'a str, &'a str)>,
    self_closing: bool,
) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attribute(value));
        out.push('"');
    }
    if self_closing {
        out.push_str("/>");
    } else {
        out.push('>');
    }
}
