//! Updates of one step, addressed by document name and position.

use pul_core::{attr, Fragment, Pre, QName};
use pul_store::{xml, Catalog};
use pul_update::{Primitive, Put, StoreOp, Target, Update};

use crate::error::{ScenarioError, ScenarioResult};

/// What an operation does. XML payloads are parsed when the step runs.
#[derive(Debug, Clone)]
pub enum Action {
    InsertBefore(String),
    InsertAfter(String),
    InsertInto(String),
    InsertIntoFirst(String),
    InsertAttribute { name: QName, value: String },
    Delete,
    ReplaceNode(String),
    ReplaceValue(String),
    ReplaceElementContent(String),
    Rename(QName),
    Put(String),
    Optimize,
    RenameStore(String),
    DropStore,
}

/// One update on a named document.
#[derive(Debug, Clone)]
pub struct Operation {
    pub document: String,
    pub pre: Pre,
    pub action: Action,
}

impl Operation {
    /// Resolve the operation against a catalog.
    pub fn to_update(&self, catalog: &Catalog) -> ScenarioResult<Update> {
        let source = catalog
            .find(&self.document)
            .ok_or_else(|| ScenarioError::document_not_found(&self.document))?;
        let target = Target::new(source, self.pre);

        let update = match &self.action {
            Action::InsertBefore(xml) => Primitive::insert_before(target, self.payload(xml)?).into(),
            Action::InsertAfter(xml) => Primitive::insert_after(target, self.payload(xml)?).into(),
            Action::InsertInto(xml) => Primitive::insert_into(target, self.payload(xml)?).into(),
            Action::InsertIntoFirst(xml) => {
                Primitive::insert_into_first(target, self.payload(xml)?).into()
            }
            Action::InsertAttribute { name, value } => {
                Primitive::insert_attributes(target, attr(name.clone(), value.clone()).build())
                    .into()
            }
            Action::Delete => Primitive::delete(target).into(),
            Action::ReplaceNode(xml) => Primitive::replace_node(target, self.payload(xml)?).into(),
            Action::ReplaceValue(value) => Primitive::replace_value(target, value.clone()).into(),
            Action::ReplaceElementContent(value) => {
                Primitive::replace_element_content(target, value.clone()).into()
            }
            Action::Rename(name) => Primitive::rename(target, name.clone()).into(),
            Action::Put(uri) => Put::new(target, uri.clone()).into(),
            Action::Optimize => Update::store(source, StoreOp::Optimize),
            Action::RenameStore(name) => Update::store(source, StoreOp::Rename(name.clone())),
            Action::DropStore => Update::store(source, StoreOp::Drop),
        };
        Ok(update)
    }

    fn payload(&self, input: &str) -> ScenarioResult<Fragment> {
        xml::parse(input).map_err(|e| {
            ScenarioError::invalid_xml(format!("payload for {}:{}", self.document, self.pre), e.to_string())
        })
    }
}

/// Builder for the operations of one step, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Operations {
    operations: Vec<Operation>,
}

impl Operations {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, document: &str, pre: Pre, action: Action) -> Self {
        self.operations.push(Operation {
            document: document.to_string(),
            pre,
            action,
        });
        self
    }

    pub fn insert_before(self, document: &str, pre: Pre, xml: &str) -> Self {
        self.push(document, pre, Action::InsertBefore(xml.to_string()))
    }

    pub fn insert_after(self, document: &str, pre: Pre, xml: &str) -> Self {
        self.push(document, pre, Action::InsertAfter(xml.to_string()))
    }

    pub fn insert_into(self, document: &str, pre: Pre, xml: &str) -> Self {
        self.push(document, pre, Action::InsertInto(xml.to_string()))
    }

    pub fn insert_into_first(self, document: &str, pre: Pre, xml: &str) -> Self {
        self.push(document, pre, Action::InsertIntoFirst(xml.to_string()))
    }

    pub fn insert_attribute(
        self,
        document: &str,
        pre: Pre,
        name: impl Into<QName>,
        value: &str,
    ) -> Self {
        let action = Action::InsertAttribute {
            name: name.into(),
            value: value.to_string(),
        };
        self.push(document, pre, action)
    }

    pub fn delete(self, document: &str, pre: Pre) -> Self {
        self.push(document, pre, Action::Delete)
    }

    pub fn replace_node(self, document: &str, pre: Pre, xml: &str) -> Self {
        self.push(document, pre, Action::ReplaceNode(xml.to_string()))
    }

    pub fn replace_value(self, document: &str, pre: Pre, value: &str) -> Self {
        self.push(document, pre, Action::ReplaceValue(value.to_string()))
    }

    pub fn replace_element_content(self, document: &str, pre: Pre, value: &str) -> Self {
        self.push(document, pre, Action::ReplaceElementContent(value.to_string()))
    }

    pub fn rename(self, document: &str, pre: Pre, name: impl Into<QName>) -> Self {
        self.push(document, pre, Action::Rename(name.into()))
    }

    pub fn put(self, document: &str, pre: Pre, uri: &str) -> Self {
        self.push(document, pre, Action::Put(uri.to_string()))
    }

    pub fn optimize(self, document: &str) -> Self {
        self.push(document, 0, Action::Optimize)
    }

    pub fn rename_store(self, document: &str, name: &str) -> Self {
        self.push(document, 0, Action::RenameStore(name.to_string()))
    }

    pub fn drop_store(self, document: &str) -> Self {
        self.push(document, 0, Action::DropStore)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> + '_ {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The same operations in reverse arrival order.
    pub fn reversed(&self) -> Self {
        Self {
            operations: self.operations.iter().rev().cloned().collect(),
        }
    }
}
