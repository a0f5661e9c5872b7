//! Dialect-agnostic feed document model.
//!
//! RSS 2.0, RSS 1.0 (RDF) and Atom documents are read into the same shape: a
//! channel title and link plus a list of items, where every item keeps all of
//! its child elements keyed by their qualified XML name (`media:content`,
//! `content:encoded`, ...). Nothing is dropped, because image extraction
//! depends on extension fields that no fixed schema covers.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use thiserror::Error;

/// SEC-003: Maximum element nesting accepted in a feed document.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Feed nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    #[error("Document ended with unclosed <{0}> element")]
    Unclosed(String),

    #[error("Not a feed document (root element <{0}>)")]
    UnknownRoot(String),

    #[error("Document is empty")]
    Empty,
}

/// Value of one field on a feed item.
///
/// Elements that carry only text become [`FieldValue::Text`]; elements with
/// attributes or child elements become [`FieldValue::Element`]. A field that
/// appears more than once on the same parent becomes [`FieldValue::List`] in
/// document order.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Element(Element),
    List(Vec<FieldValue>),
}

/// An element with attributes and/or children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Attribute group (`url`, `type`, `href`, ...).
    pub attrs: BTreeMap<String, String>,
    /// Concatenated text and CDATA content, if any.
    pub text: Option<String>,
    /// Child elements keyed by qualified name.
    pub children: BTreeMap<String, FieldValue>,
}

impl FieldValue {
    /// Iterates a field that may hold one value or a list of values.
    ///
    /// Single values yield themselves once; lists yield their members. Every
    /// lookup in the extractor goes through this so the single-vs-list shape
    /// never matters to callers.
    pub fn iter(&self) -> impl Iterator<Item = &FieldValue> {
        let members: &[FieldValue] = match self {
            FieldValue::List(values) => values,
            single => std::slice::from_ref(single),
        };
        members.iter()
    }

    /// Text content of the field. For a list, the first member's text.
    pub fn text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Element(el) => el.text.as_deref(),
            FieldValue::List(values) => values.first().and_then(FieldValue::text),
        }
    }

    /// Attribute lookup; `None` for text-only values and lists.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            FieldValue::Element(el) => el.attrs.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Child element lookup; `None` for text-only values and lists.
    pub fn child(&self, name: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Element(el) => el.children.get(name),
            _ => None,
        }
    }
}

/// One `<item>` / `<entry>` with every child element preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeedItem {
    fields: BTreeMap<String, FieldValue>,
}

impl RawFeedItem {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Text of the first named field that has non-blank text.
    pub fn first_text(&self, names: &[&str]) -> Option<&str> {
        names
            .iter()
            .filter_map(|name| self.get(name).and_then(FieldValue::text))
            .find(|text| !text.trim().is_empty())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl FromIterator<(String, FieldValue)> for RawFeedItem {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut fields = BTreeMap::new();
        for (name, value) in iter {
            insert_field(&mut fields, name, value);
        }
        Self { fields }
    }
}

/// A parsed feed: channel metadata plus raw items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDocument {
    pub title: Option<String>,
    pub link: Option<String>,
    pub items: Vec<RawFeedItem>,
}

/// Generic element tree built while reading the document.
#[derive(Debug, Default)]
struct Node {
    name: String,
    attrs: BTreeMap<String, String>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn children_named<'a, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a Node> + 'b
    where
        'a: 'b,
    {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    fn take_child(&mut self, name: &str) -> Option<Node> {
        let pos = self.children.iter().position(|c| c.name == name)?;
        Some(self.children.remove(pos))
    }

    fn into_items(self, item_name: &str) -> Vec<RawFeedItem> {
        self.children
            .into_iter()
            .filter(|c| c.name == item_name)
            .map(Node::into_item)
            .collect()
    }

    fn into_value(self) -> FieldValue {
        if self.attrs.is_empty() && self.children.is_empty() {
            return FieldValue::Text(self.text);
        }
        let text = Some(self.text).filter(|t| !t.trim().is_empty());
        let mut children = BTreeMap::new();
        for child in self.children {
            let name = child.name.clone();
            insert_field(&mut children, name, child.into_value());
        }
        FieldValue::Element(Element {
            attrs: self.attrs,
            text,
            children,
        })
    }

    fn into_item(self) -> RawFeedItem {
        self.children
            .into_iter()
            .map(|child| (child.name.clone(), child.into_value()))
            .collect()
    }
}

fn insert_field(map: &mut BTreeMap<String, FieldValue>, name: String, value: FieldValue) {
    match map.remove(&name) {
        None => {
            map.insert(name, value);
        }
        Some(FieldValue::List(mut values)) => {
            values.push(value);
            map.insert(name, FieldValue::List(values));
        }
        Some(existing) => {
            map.insert(name, FieldValue::List(vec![existing, value]));
        }
    }
}

/// Parses RSS 2.0, RSS 1.0 (RDF) or Atom bytes into a [`FeedDocument`].
///
/// # Errors
///
/// - [`ParseError::Xml`] for malformed XML (mismatched tags, bad encoding)
/// - [`ParseError::UnknownRoot`] when the root is not `rss`, `rdf:RDF` or `feed`
/// - [`ParseError::MaxDepthExceeded`] for pathologically nested input
///
/// # Security
///
/// SEC-002: quick-xml (0.37) never expands `<!ENTITY>` declarations, so
/// external entity payloads in a hostile feed are inert.
pub fn parse_document(bytes: &[u8]) -> Result<FeedDocument, ParseError> {
    let mut root = read_tree(bytes)?;
    let root_name = std::mem::take(&mut root.name);

    match root_name.as_str() {
        "rss" => {
            let Some(channel) = root.take_child("channel") else {
                return Ok(FeedDocument::default());
            };
            Ok(FeedDocument {
                title: channel.child_text("title"),
                link: channel.child_text("link"),
                items: channel.into_items("item"),
            })
        }
        "rdf:RDF" | "RDF" => {
            let channel = root.take_child("channel").unwrap_or_default();
            let title = channel.child_text("title");
            let link = channel.child_text("link");
            // RSS 1.0 puts items next to the channel, not inside it
            let items = if root.child("item").is_some() {
                root.into_items("item")
            } else {
                channel.into_items("item")
            };
            Ok(FeedDocument { title, link, items })
        }
        "feed" => Ok(FeedDocument {
            title: root.child_text("title"),
            link: atom_link(&root),
            items: root.into_items("entry"),
        }),
        other => Err(ParseError::UnknownRoot(other.to_string())),
    }
}

/// Atom feed link: the `alternate` link if present, else the first link.
fn atom_link(feed: &Node) -> Option<String> {
    feed.children_named("link")
        .find(|l| l.attrs.get("rel").map_or(true, |rel| rel == "alternate"))
        .or_else(|| feed.child("link"))
        .and_then(|l| l.attrs.get("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn read_tree(bytes: &[u8]) -> Result<Node, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(ParseError::MaxDepthExceeded(MAX_DEPTH));
                }
                stack.push(open_node(&e, &reader)?);
            }
            Ok(Event::Empty(e)) => {
                let node = open_node(&e, &reader)?;
                close_node(node, &mut stack, &mut root);
            }
            Ok(Event::End(_)) => {
                // Mismatched end tags are rejected by the reader itself
                if let Some(node) = stack.pop() {
                    close_node(node, &mut stack, &mut root);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(node) = stack.last_mut() {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        // Undeclared HTML entities (&nbsp;) are common in the wild; keep them raw
                        Err(_) => reader
                            .decoder()
                            .decode(&e)
                            .map_err(|err| ParseError::Xml(err.to_string()))?
                            .into_owned(),
                    };
                    node.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(node) = stack.last_mut() {
                    let text = reader
                        .decoder()
                        .decode(&e)
                        .map_err(|err| ParseError::Xml(err.to_string()))?;
                    node.text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Unclosed(open.name.clone()));
    }
    root.ok_or(ParseError::Empty)
}

fn open_node(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Node, ParseError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = BTreeMap::new();

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(err) => {
                tracing::debug!(element = %name, error = %err, "Skipping malformed feed attribute");
                continue;
            }
        };
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|err| ParseError::Xml(err.to_string()))?;
        attrs.insert(key, value.into_owned());
    }

    Ok(Node {
        name,
        attrs,
        ..Node::default()
    })
}

fn close_node(node: Node, stack: &mut [Node], root: &mut Option<Node>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            // Only the first top-level element counts as the document root
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}
