//! XML input and output of tables.
//!
//! Parsing produces a fragment whose top-level nodes become roots. Namespace
//! declarations are resolved into the names and not kept as rows; the
//! serializer emits declarations wherever the in-scope bindings differ.
//! Whitespace-only text is dropped on input.

use pul_core::{Fragment, NodeKind, Pre, QName, Row, StoreError, StoreResult};
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::Writer;

use crate::Store;

/// URI bound to the predeclared `xml` prefix.
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";

// ==================== Parsing ====================

/// Parse an XML string into a fragment.
pub fn parse(input: &str) -> StoreResult<Fragment> {
    let mut reader = Reader::from_str(input);
    let mut builder = TableBuilder::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => builder.open(&e)?,
            Ok(Event::Empty(e)) => {
                builder.open(&e)?;
                builder.close()?;
            }
            Ok(Event::End(_)) => builder.close()?,
            Ok(Event::Text(t)) => {
                let value = t.unescape().map_err(|e| StoreError::parse(e.to_string()))?;
                builder.text(&value);
            }
            Ok(Event::CData(c)) => builder.text(&String::from_utf8_lossy(&c)),
            Ok(Event::Comment(c)) => {
                builder.leaf(Row::comment(String::from_utf8_lossy(&c).into_owned()));
            }
            Ok(Event::PI(p)) => {
                let target = QName::parse(&String::from_utf8_lossy(p.target()))?;
                let content = String::from_utf8_lossy(p.content()).trim_start().to_string();
                builder.leaf(Row::processing_instruction(target, content));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(StoreError::parse(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    builder.finish()
}

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Row>,
    /// Positions of the open elements
    open: Vec<Pre>,
    /// Namespace declarations per open element
    scopes: Vec<Vec<(Option<String>, String)>>,
    /// Whether the last row is a text that may still grow
    in_text: bool,
}

impl TableBuilder {
    fn push(&mut self, mut row: Row) {
        let pre = self.rows.len();
        row.dist = self.open.last().map_or(0, |&parent| pre - parent);
        self.rows.push(row);
    }

    fn open(&mut self, start: &BytesStart<'_>) -> StoreResult<()> {
        self.in_text = false;
        let lexical = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut scope = Vec::new();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| StoreError::parse(e.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| StoreError::parse(e.to_string()))?
                .into_owned();
            if key == "xmlns" {
                scope.push((None, value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.push((Some(prefix.to_string()), value));
            } else {
                attributes.push((key, value));
            }
        }
        self.scopes.push(scope);

        let name = self.resolve(&lexical, true)?;
        let pre = self.rows.len();
        self.push(Row::element(name));
        self.open.push(pre);
        for (key, value) in attributes {
            let name = self.resolve(&key, false)?;
            self.push(Row::attribute(name, value));
        }
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        self.in_text = false;
        let pre = self
            .open
            .pop()
            .ok_or_else(|| StoreError::parse("unexpected end tag"))?;
        self.rows[pre].size = self.rows.len() - pre;
        self.scopes.pop();
        Ok(())
    }

    fn text(&mut self, value: &str) {
        if self.in_text {
            if let Some(last) = self.rows.last_mut() {
                last.value.get_or_insert_with(String::new).push_str(value);
                return;
            }
        }
        if value.trim().is_empty() {
            return;
        }
        self.push(Row::text(value));
        self.in_text = true;
    }

    fn leaf(&mut self, row: Row) {
        self.in_text = false;
        self.push(row);
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn resolve(&self, lexical: &str, element: bool) -> StoreResult<QName> {
        let mut name = QName::parse(lexical)?;
        name.uri = match name.prefix.as_deref() {
            Some("xml") => Some(XML_URI.to_string()),
            Some(prefix) => Some(
                self.lookup(Some(prefix))
                    .filter(|uri| !uri.is_empty())
                    .ok_or_else(|| StoreError::parse(format!("unbound prefix: {}", prefix)))?
                    .to_string(),
            ),
            None if element => self
                .lookup(None)
                .filter(|uri| !uri.is_empty())
                .map(str::to_string),
            None => None,
        };
        Ok(name)
    }

    fn finish(self) -> StoreResult<Fragment> {
        if let Some(&pre) = self.open.last() {
            let name = self.rows[pre]
                .name
                .as_ref()
                .map(QName::lexical)
                .unwrap_or_default();
            return Err(StoreError::parse(format!("unclosed element: {}", name)));
        }
        Ok(Fragment::from_rows(self.rows))
    }
}

// ==================== Serialization ====================

/// Serialize the subtree at a position.
pub fn serialize(store: &dyn Store, pre: Pre) -> StoreResult<String> {
    let mut serializer = Serializer::new();
    serializer.node(store, pre)?;
    serializer.finish()
}

/// Serialize all top-level nodes of a table.
pub fn serialize_all(store: &dyn Store) -> StoreResult<String> {
    let mut serializer = Serializer::new();
    for pre in store.roots() {
        serializer.node(store, pre)?;
    }
    serializer.finish()
}

struct Serializer {
    writer: Writer<Vec<u8>>,
    /// In-scope bindings per open element; `None` unbinds the default namespace
    scopes: Vec<Vec<(Option<String>, Option<String>)>>,
}

impl Serializer {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            scopes: Vec::new(),
        }
    }

    fn emit(&mut self, event: Event<'_>) -> StoreResult<()> {
        self.writer
            .write_event(event)
            .map_err(|e| StoreError::serialize(e.to_string()))
    }

    fn node(&mut self, store: &dyn Store, pre: Pre) -> StoreResult<()> {
        let row = store.row(pre)?;
        match row.kind {
            NodeKind::Document => self.children(store, pre, 0),
            NodeKind::Element => self.element(store, pre),
            NodeKind::Attribute => {
                let name = row.name.as_ref().map(QName::lexical).unwrap_or_default();
                let value = row.value.as_deref().unwrap_or_default();
                let out = format!("{}=\"{}\"", name, escape(value));
                self.writer.get_mut().extend_from_slice(out.as_bytes());
                Ok(())
            }
            NodeKind::Text => {
                let value = row.value.as_deref().unwrap_or_default();
                self.emit(Event::Text(BytesText::new(value)))
            }
            NodeKind::Comment => {
                let value = row.value.as_deref().unwrap_or_default();
                self.emit(Event::Comment(BytesText::from_escaped(value)))
            }
            NodeKind::ProcessingInstruction => {
                let target = row.name.as_ref().map(QName::lexical).unwrap_or_default();
                let content = match row.value.as_deref() {
                    Some(value) if !value.is_empty() => format!("{} {}", target, value),
                    _ => target,
                };
                self.emit(Event::PI(BytesPI::new(content)))
            }
        }
    }

    fn children(&mut self, store: &dyn Store, pre: Pre, attributes: usize) -> StoreResult<()> {
        let end = pre + store.size(pre)?;
        let mut child = pre + 1 + attributes;
        while child < end {
            self.node(store, child)?;
            child += store.size(child)?;
        }
        Ok(())
    }

    fn element(&mut self, store: &dyn Store, pre: Pre) -> StoreResult<()> {
        let row = store.row(pre)?;
        let name = row
            .name
            .as_ref()
            .ok_or_else(|| StoreError::invalid_kind(pre, "element", "element without name"))?;
        let lexical = name.lexical();
        let attributes = store.attribute_count(pre)?;

        self.scopes.push(Vec::new());
        let mut start = BytesStart::new(lexical.as_str());
        self.declare(&mut start, name.prefix.as_deref(), name.uri.as_deref());
        for attr in pre + 1..pre + 1 + attributes {
            let attr_row = store.row(attr)?;
            if let Some(attr_name) = &attr_row.name {
                if attr_name.prefix.is_some() {
                    self.declare(&mut start, attr_name.prefix.as_deref(), attr_name.uri.as_deref());
                }
            }
        }
        for attr in pre + 1..pre + 1 + attributes {
            let attr_row = store.row(attr)?;
            let key = attr_row.name.as_ref().map(QName::lexical).unwrap_or_default();
            start.push_attribute((key.as_str(), attr_row.value.as_deref().unwrap_or_default()));
        }

        if row.size == 1 + attributes {
            self.emit(Event::Empty(start))?;
        } else {
            self.emit(Event::Start(start))?;
            self.children(store, pre, attributes)?;
            self.emit(Event::End(BytesEnd::new(lexical.as_str())))?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn declare(&mut self, start: &mut BytesStart<'_>, prefix: Option<&str>, uri: Option<&str>) {
        if prefix == Some("xml") {
            return;
        }
        let bound = self
            .scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(p, _)| p.as_deref() == prefix)
            .and_then(|(_, u)| u.as_deref());
        if bound == uri {
            return;
        }
        let key = match prefix {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        start.push_attribute((key.as_str(), uri.unwrap_or_default()));
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((prefix.map(str::to_string), uri.map(str::to_string)));
        }
    }

    fn finish(self) -> StoreResult<String> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| StoreError::serialize(e.to_string()))
    }
}
