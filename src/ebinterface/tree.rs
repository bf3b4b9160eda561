use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;

use crate::core::EbiError;

/// Documents nested deeper than this are rejected while parsing.
const MAX_DEPTH: usize = 256;

/// Namespace-resolved XML element with its text and child elements.
///
/// Only unprefixed attributes are kept; namespace declarations and
/// foreign attributes such as `xsi:schemaLocation` are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed character data directly inside this element.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn open(namespace: Option<String>, start: &BytesStart<'_>) -> Result<Self, EbiError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| EbiError::Malformed(format!("attribute error: {e}")))?;
            let key = attr.key.as_ref();
            if key.starts_with(b"xmlns") || attr.key.prefix().is_some() {
                continue;
            }
            let value = attr
                .unescape_value()
                .map_err(|e| EbiError::Malformed(format!("attribute value error: {e}")))?;
            attributes.push((String::from_utf8_lossy(key).into_owned(), value.into_owned()));
        }
        Ok(Self {
            namespace,
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the named child, if present and non-empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }

    /// All descendants reached by a relative path of local names
    /// ("Address/Email"). An empty path selects `self`.
    pub fn select(&self, path: &str) -> Vec<&XmlElement> {
        let mut current = vec![self];
        for step in path.split('/').filter(|s| !s.is_empty()) {
            current = current
                .into_iter()
                .flat_map(|e| e.children.iter().filter(move |c| c.name == step))
                .collect();
        }
        current
    }
}

/// Parse `bytes` into an element tree, failing on the first
/// well-formedness problem.
pub fn parse_tree(bytes: &[u8]) -> Result<XmlElement, EbiError> {
    let mut reader = NsReader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_resolved_event_into(&mut buf)
            .map(|(ns, ev)| (resolved_namespace(ns), ev.into_owned()));
        let (namespace, event) = match event {
            Ok(v) => v,
            Err(e) => {
                return Err(EbiError::Malformed(format!(
                    "at position {}: {e}",
                    reader.buffer_position()
                )));
            }
        };

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if root.is_some() {
                    return Err(EbiError::Malformed(
                        "content after the root element".into(),
                    ));
                }
                if stack.len() >= MAX_DEPTH {
                    return Err(EbiError::Malformed(format!(
                        "elements nested deeper than {MAX_DEPTH} levels"
                    )));
                }
                let element = XmlElement::open(namespace, e)?;
                if matches!(event, Event::Empty(_)) {
                    close(element, &mut stack, &mut root);
                } else {
                    stack.push(element);
                }
            }
            Event::End(_) => match stack.pop() {
                Some(element) => close(element, &mut stack, &mut root),
                None => {
                    return Err(EbiError::Malformed("unbalanced end tag".into()));
                }
            },
            Event::Text(ref t) => {
                let text = t
                    .unescape()
                    .map_err(|e| EbiError::Malformed(format!("text error: {e}")))?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(ref c) => {
                let text = String::from_utf8_lossy(c).into_owned();
                append_text(&mut stack, text.trim())?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(EbiError::Malformed(format!(
            "unexpected end of document, <{}> is not closed",
            open.name
        )));
    }
    root.ok_or_else(|| EbiError::Malformed("document has no root element".into()))
}

fn resolved_namespace(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.into_inner()).into_owned()),
        _ => None,
    }
}

fn close(element: XmlElement, stack: &mut [XmlElement], root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn append_text(stack: &mut [XmlElement], text: &str) -> Result<(), EbiError> {
    if text.is_empty() {
        return Ok(());
    }
    match stack.last_mut() {
        Some(current) => {
            current.text.push_str(text);
            Ok(())
        }
        None => Err(EbiError::Malformed(
            "character data outside the root element".into(),
        )),
    }
}
