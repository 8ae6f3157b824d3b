//! Namespace-resolved, read-only XML element tree.
//!
//! Built from `quick-xml` events so that catalogue and capabilities
//! documents can be queried with fixed, namespaced element paths such as
//! `dataset/dataset/access`. Only element structure, attributes and text
//! are kept; comments, processing instructions and the prolog are dropped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use thiserror::Error;

/// Deepest element nesting accepted by [`XmlElement::parse`].
pub const MAX_DEPTH: usize = 256;

/// Errors raised while building an element tree.
#[derive(Debug, Error)]
pub enum XmlParseError {
    #[error("XML syntax error near byte {position}: {source}")]
    Syntax {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("unexpected end of document, <{0}> is never closed")]
    Unclosed(String),

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("document has no root element")]
    NoRoot,

    #[error("elements nested deeper than {0} levels")]
    TooDeep(usize),
}

/// Namespace-qualified element or attribute name used in path queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QName {
    pub namespace: Option<&'static str>,
    pub local: &'static str,
}

impl QName {
    pub const fn ns(namespace: &'static str, local: &'static str) -> Self {
        Self {
            namespace: Some(namespace),
            local,
        }
    }

    /// Name with no namespace, as used by unprefixed attributes.
    pub const fn local(local: &'static str) -> Self {
        Self {
            namespace: None,
            local,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct XmlAttribute {
    namespace: Option<String>,
    name: String,
    value: String,
}

/// A parsed XML element with its resolved namespace, attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub namespace: Option<String>,
    pub name: String,
    pub children: Vec<XmlElement>,
    attributes: Vec<XmlAttribute>,
    text: String,
}

impl XmlElement {
    /// Parse a complete document and return its root element.
    ///
    /// Fails on any syntax error, mismatched or unclosed tag, a body with
    /// no root element (for example a plain-text error page), or nesting
    /// past [`MAX_DEPTH`].
    pub fn parse(xml: &str) -> Result<Self, XmlParseError> {
        let mut reader = NsReader::from_str(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut open: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let position = reader.buffer_position();
            let (resolved, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(|source| XmlParseError::Syntax { position, source })?;
            let namespace = namespace_of(resolved);

            match event {
                Event::Start(e) => {
                    if open.len() >= MAX_DEPTH {
                        return Err(XmlParseError::TooDeep(MAX_DEPTH));
                    }
                    let element = open_element(&reader, namespace, &e)
                        .map_err(|source| XmlParseError::Syntax { position, source })?;
                    open.push(element);
                }
                Event::Empty(e) => {
                    let element = open_element(&reader, namespace, &e)
                        .map_err(|source| XmlParseError::Syntax { position, source })?;
                    attach(&mut open, &mut root, element)?;
                }
                Event::End(_) => {
                    // quick-xml rejects mismatched end tags before we get here
                    if let Some(element) = open.pop() {
                        attach(&mut open, &mut root, element)?;
                    }
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|source| XmlParseError::Syntax { position, source })?;
                    if let Some(current) = open.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Event::CData(c) => {
                    if let Some(current) = open.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(unclosed) = open.last() {
            return Err(XmlParseError::Unclosed(unclosed.name.clone()));
        }
        root.ok_or(XmlParseError::NoRoot)
    }

    /// Whether this element has the given qualified name.
    pub fn is(&self, name: QName) -> bool {
        self.name == name.local && self.namespace.as_deref() == name.namespace
    }

    /// Value of the attribute with the given qualified name.
    pub fn attribute(&self, name: QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name.local && a.namespace.as_deref() == name.namespace)
            .map(|a| a.value.as_str())
    }

    /// Trimmed text content directly inside this element.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Direct children with the given name, in document order.
    pub fn children_named(&self, name: QName) -> impl Iterator<Item = &XmlElement> + '_ {
        self.children.iter().filter(move |c| c.is(name))
    }

    /// All elements reached by following `path` one child level per step,
    /// starting below this element. Document order is preserved.
    pub fn find_all(&self, path: &[QName]) -> Vec<&XmlElement> {
        let mut current: Vec<&XmlElement> = vec![self];
        for step in path {
            current = current
                .into_iter()
                .flat_map(|e| e.children_named(*step))
                .collect();
        }
        current
    }

    /// First element reached by `path`, if any.
    pub fn find(&self, path: &[QName]) -> Option<&XmlElement> {
        self.find_all(path).into_iter().next()
    }
}

fn namespace_of(resolved: ResolveResult) -> Option<String> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        _ => None,
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    namespace: Option<String>,
    start: &BytesStart,
) -> Result<XmlElement, quick_xml::Error> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let (resolved, local) = reader.resolve_attribute(attr.key);
        attributes.push(XmlAttribute {
            namespace: namespace_of(resolved),
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value: attr.unescape_value()?.into_owned(),
        });
    }

    Ok(XmlElement {
        namespace,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        children: Vec::new(),
        attributes,
        text: String::new(),
    })
}

fn attach(
    open: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), XmlParseError> {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(XmlParseError::MultipleRoots),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test";
    const A: QName = QName::ns(NS, "a");
    const B: QName = QName::ns(NS, "b");

    #[test]
    fn test_parse_resolves_default_and_prefixed_namespaces() {
        let xml = r#"<?xml version="1.0"?>
<a xmlns="urn:test" xmlns:x="urn:other">
    <b x:href="one" plain="p"/>
    <x:b>two</x:b>
</a>"#;
        let root = XmlElement::parse(xml).unwrap();
        assert!(root.is(A));

        let bs: Vec<_> = root.children_named(B).collect();
        assert_eq!(bs.len(), 1);
        assert_eq!(bs[0].attribute(QName::ns("urn:other", "href")), Some("one"));
        assert_eq!(bs[0].attribute(QName::local("plain")), Some("p"));
        // Unprefixed attributes carry no namespace.
        assert_eq!(bs[0].attribute(QName::ns(NS, "plain")), None);

        let other = root.find(&[QName::ns("urn:other", "b")]).unwrap();
        assert_eq!(other.text(), "two");
    }

    #[test]
    fn test_find_all_follows_fixed_depth() {
        let xml = r#"<a xmlns="urn:test"><a><b>1</b></a><b>0</b><a><b>2</b><a><b>3</b></a></a></a>"#;
        let root = XmlElement::parse(xml).unwrap();
        let texts: Vec<_> = root.find_all(&[A, B]).iter().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["1", "2"]);
        assert!(root.find_all(&[A, A, A, B]).is_empty());
    }

    #[test]
    fn test_entities_are_unescaped() {
        let root = XmlElement::parse(r#"<r v="a&amp;b">x &lt; y</r>"#).unwrap();
        assert_eq!(root.attribute(QName::local("v")), Some("a&b"));
        assert_eq!(root.text(), "x < y");
    }

    #[test]
    fn test_rejects_malformed_documents() {
        assert!(matches!(
            XmlElement::parse("<a><b></a>"),
            Err(XmlParseError::Syntax { .. })
        ));
        assert!(XmlElement::parse("<a><b/>").is_err());
        assert!(matches!(XmlElement::parse("Not Found"), Err(XmlParseError::NoRoot)));
        assert!(matches!(XmlElement::parse(""), Err(XmlParseError::NoRoot)));
        assert!(matches!(
            XmlElement::parse("<a/><b/>"),
            Err(XmlParseError::MultipleRoots)
        ));
    }

    #[test]
    fn test_rejects_excessive_nesting() {
        let n = 100_000;
        let deep = format!("{}{}", "<a>".repeat(n), "</a>".repeat(n));
        assert!(matches!(
            XmlElement::parse(&deep),
            Err(XmlParseError::TooDeep(MAX_DEPTH))
        ));

        let n = MAX_DEPTH;
        let at_limit = format!("{}{}", "<a>".repeat(n), "</a>".repeat(n));
        assert!(XmlElement::parse(&at_limit).is_ok());
    }
}
