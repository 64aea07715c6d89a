//! Schema registry
//!
//! Resolves link targets declared by name. Registration is explicit;
//! nothing is added behind the caller's back.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::warn;

use crate::error::{Result, ScrapeError};
use crate::schema::Schema;

#[derive(Debug, Default)]
pub struct Registry {
    schemas: RefCell<HashMap<String, Rc<Schema>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` under its name. A schema already registered under
    /// that name is replaced.
    pub fn register(&self, schema: Schema) -> Rc<Schema> {
        let schema = Rc::new(schema);
        self.insert(Rc::clone(&schema));
        schema
    }

    pub fn insert(&self, schema: Rc<Schema>) {
        let name = schema.name().to_string();
        if self.schemas.borrow_mut().insert(name.clone(), schema).is_some() {
            warn!(schema = %name, "replacing previously registered schema");
        }
    }

    pub fn get(&self, name: &str) -> Option<Rc<Schema>> {
        self.schemas.borrow().get(name).cloned()
    }

    pub fn resolve(&self, name: &str) -> Result<Rc<Schema>> {
        self.get(name)
            .ok_or_else(|| ScrapeError::UnknownSchema(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.borrow().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}
