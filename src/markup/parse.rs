//! Lenient HTML reader built on `quick-xml`.
//!
//! `quick-xml` speaks XML, so a few HTML rules are layered on top:
//!
//! - void elements (`<br>`, `<img ...>`) never open a scope
//! - `<script>` and `<style>` bodies are captured verbatim
//! - unmatched or misnested end tags close up to the nearest open element
//!   with the same name, and stray end tags are dropped
//! - valueless and unquoted attributes are accepted
//!
//! Entity references stay escaped and are merged back into the surrounding
//! text node.

use super::{Attribute, Element, Markup, NodeData, NodeId};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::borrow::Cow;
use thiserror::Error;

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose body is text that must not be tokenized.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("at byte {position}: {message}")]
pub struct MarkupError {
    pub position: usize,
    pub message: String,
}

#[inline]
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(name))
}

#[inline]
fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|raw| raw.eq_ignore_ascii_case(name))
}

fn create_reader(input: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.trim_text(false);
    config.enable_all_checks(false);
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;
    reader
}

impl Markup {
    /// Parse an HTML document or fragment.
    pub fn parse(input: &str) -> Result<Self, MarkupError> {
        let mut builder = TreeBuilder::new();
        // Byte offset of the slice the current reader runs on. Raw-text
        // elements are skipped by hand and a fresh reader resumes after them.
        let mut offset = 0;

        'restart: loop {
            let mut reader = create_reader(&input[offset..]);

            loop {
                let event = reader.read_event().map_err(|err| MarkupError {
                    position: offset + reader.error_position() as usize,
                    message: err.to_string(),
                })?;

                match event {
                    Event::Start(start) => {
                        let position = offset + reader.buffer_position() as usize;
                        let element = read_element(&start, position)?;

                        if is_void(&element.name) {
                            builder.leaf(NodeData::Element(element));
                        } else if is_raw_text(&element.name) {
                            let (body, resume) = raw_text_body(input, position, &element.name);
                            let name = element.name.clone();
                            builder.open(element);
                            if !body.is_empty() {
                                builder.leaf(NodeData::Raw(body.to_owned()));
                            }
                            builder.close(&name);
                            offset = resume;
                            continue 'restart;
                        } else {
                            builder.open(element);
                        }
                    }
                    Event::Empty(start) => {
                        let position = offset + reader.buffer_position() as usize;
                        let element = read_element(&start, position)?;
                        builder.leaf(NodeData::Element(element));
                    }
                    Event::End(end) => builder.close(&lossy(end.name().as_ref())),
                    Event::Text(text) => builder.text(&lossy(&text)),
                    Event::GeneralRef(reference) => {
                        builder.text(&format!("&{};", lossy(&reference)));
                    }
                    Event::CData(cdata) => {
                        builder.leaf(NodeData::Raw(format!("<![CDATA[{}]]>", lossy(&cdata))));
                    }
                    Event::Comment(comment) => {
                        builder.leaf(NodeData::Comment(lossy(&comment).into_owned()));
                    }
                    Event::DocType(doctype) => {
                        let end = offset + reader.buffer_position() as usize;
                        let declaration = authored_doctype(input, end)
                            .map_or_else(|| format!("DOCTYPE {}", lossy(&doctype).trim()), str::to_owned);
                        builder.leaf(NodeData::Doctype(declaration));
                    }
                    // `<?xml ...?>` and processing instructions have no meaning in HTML.
                    Event::Decl(_) | Event::PI(_) => {}
                    Event::Eof => break 'restart,
                }
            }
        }

        Ok(builder.finish())
    }
}

#[inline]
fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn read_element(start: &BytesStart<'_>, position: usize) -> Result<Element, MarkupError> {
    let mut element = Element::new(lossy(start.name().as_ref()).into_owned());

    let raw = lossy(start.attributes_raw());
    let mut quotes = quote_styles(&raw).into_iter();

    let mut attributes = start.html_attributes();
    attributes.with_checks(false);
    for attr in attributes {
        let attr = attr.map_err(|err| MarkupError {
            position,
            message: err.to_string(),
        })?;
        element.attrs.push(Attribute {
            key: lossy(attr.key.as_ref()).into_owned(),
            value: lossy(&attr.value).into_owned(),
            quote: quotes.next().unwrap_or(Some('"')),
        });
    }

    Ok(element)
}

/// Quote character of each attribute in a raw attribute list, in order.
///
/// `None` marks a valueless attribute. Unquoted values report `"` so they
/// come back quoted.
fn quote_styles(raw: &str) -> Vec<Option<char>> {
    let mut styles = Vec::new();
    let mut chars = raw.char_indices().peekable();

    while let Some(&(_, c)) = chars.peek() {
        if c.is_whitespace() || c == '/' {
            chars.next();
            continue;
        }
        // key
        while chars
            .next_if(|&(_, c)| !c.is_whitespace() && c != '=' && c != '/')
            .is_some()
        {}
        while chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}

        if chars.next_if(|&(_, c)| c == '=').is_none() {
            styles.push(None);
            continue;
        }
        while chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}

        match chars.peek().map(|&(_, c)| c) {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                while chars.next_if(|&(_, c)| c != quote).is_some() {}
                chars.next();
                styles.push(Some(quote));
            }
            _ => {
                while chars.next_if(|&(_, c)| !c.is_whitespace()).is_some() {}
                styles.push(Some('"'));
            }
        }
    }
    styles
}

/// Text between `<!` and `>` of the declaration ending at byte `end`.
fn authored_doctype(input: &str, end: usize) -> Option<&str> {
    let head = input.get(..end)?.strip_suffix('>')?;
    let start = head.rfind("<!")?;
    Some(&head[start + 2..])
}

/// Slice the body of a raw-text element starting at `body_start`.
///
/// Returns the body and the offset right after the closing tag (or the end
/// of input when the element is never closed).
fn raw_text_body<'a>(input: &'a str, body_start: usize, name: &str) -> (&'a str, usize) {
    let rest = &input[body_start..];
    // ASCII lowercasing keeps byte offsets intact.
    let haystack = rest.to_ascii_lowercase();
    let needle = format!("</{}", name.to_ascii_lowercase());

    match haystack.find(&needle) {
        Some(close) => {
            let resume = haystack[close..]
                .find('>')
                .map_or(input.len(), |gt| body_start + close + gt + 1);
            (&rest[..close], resume)
        }
        None => (rest, input.len()),
    }
}

// ============================================================================
// Tree Builder
// ============================================================================

struct TreeBuilder {
    doc: Markup,
    /// Open elements with their lowercased names.
    stack: Vec<(NodeId, String)>,
    /// Text is buffered so entity references merge into one node.
    pending: String,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            doc: Markup::new(),
            stack: Vec::new(),
            pending: String::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.stack.last().map_or(self.doc.root(), |(id, _)| *id)
    }

    fn flush_text(&mut self) {
        if !self.pending.is_empty() {
            let text = std::mem::take(&mut self.pending);
            let parent = self.current();
            self.doc.append_text(parent, text);
        }
    }

    fn text(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    fn leaf(&mut self, data: NodeData) {
        self.flush_text();
        let parent = self.current();
        let id = self.doc.create(data);
        self.doc.append(parent, id);
    }

    fn open(&mut self, element: Element) {
        self.flush_text();
        let name = element.name.to_ascii_lowercase();
        let parent = self.current();
        let id = self.doc.append_element(parent, element);
        self.stack.push((id, name));
    }

    fn close(&mut self, name: &str) {
        self.flush_text();
        let name = name.trim().to_ascii_lowercase();
        if let Some(index) = self.stack.iter().rposition(|(_, open)| *open == name) {
            self.stack.truncate(index);
        }
    }

    fn finish(mut self) -> Markup {
        self.flush_text();
        self.doc
    }
}
