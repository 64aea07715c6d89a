//! Compound extraction over named sub-fields
//!
//! Sub-fields run relative to one matched element. A group yields a lazy
//! [`GroupView`] per element; a record materialises the same sub-fields
//! into a map straight away.

use std::collections::BTreeMap;
use std::fmt;

use scraper::ElementRef;

use super::{Scope, Subfields};
use crate::error::{Result, ScrapeError};
use crate::page::Page;
use crate::value::Value;

/// Per-element view over a group's sub-fields.
///
/// Nothing is extracted until a sub-field is read. The set of names is
/// fixed by the field declaration.
#[derive(Clone, Copy)]
pub struct GroupView<'a> {
    page: &'a Page,
    element: ElementRef<'a>,
    subfields: &'a Subfields,
}

impl<'a> GroupView<'a> {
    pub(super) fn new(page: &'a Page, element: ElementRef<'a>, subfields: &'a Subfields) -> Self {
        Self {
            page,
            element,
            subfields,
        }
    }

    /// Extract one sub-field. Undeclared names are
    /// [`ScrapeError::FieldNotFound`], never `Null`.
    pub fn get(&self, name: &str) -> Result<Value<'a>> {
        let field = self
            .subfields
            .get(name)
            .ok_or_else(|| ScrapeError::FieldNotFound(name.to_string()))?;
        field.get(Scope::Element(self.element), self.page)
    }

    /// Declared sub-field names, sorted
    pub fn names(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.subfields.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.subfields.contains_key(name)
    }

    /// The element the sub-fields are evaluated against
    pub fn element(&self) -> ElementRef<'a> {
        self.element
    }

    pub fn to_map(&self) -> Result<BTreeMap<String, Value<'a>>> {
        let mut map = BTreeMap::new();
        for (name, field) in self.subfields {
            map.insert(name.clone(), field.get(Scope::Element(self.element), self.page)?);
        }
        Ok(map)
    }
}

impl PartialEq for GroupView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.element.id() == other.element.id() && std::ptr::eq(self.subfields, other.subfields)
    }
}

impl fmt::Debug for GroupView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupView")
            .field("element", &self.element.value().name())
            .field("fields", &self.subfields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Eager form: every sub-field of `element`, materialised
pub(super) fn record<'a>(
    page: &'a Page,
    element: ElementRef<'a>,
    subfields: &'a Subfields,
) -> Result<Value<'a>> {
    GroupView::new(page, element, subfields).to_map().map(Value::Map)
}
