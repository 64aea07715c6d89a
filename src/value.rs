//! Values produced by field extraction
//!
//! A [`Value`] is the dynamic result of running a field's pipeline. The
//! lifetime ties lazy group views to the document of the page they were
//! read from.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::{Map, Number};

use crate::error::Result;
use crate::fields::GroupView;
use crate::page::Page;

#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// Extraction miss or failed coercion
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDateTime),
    DateTime(DateTime<FixedOffset>),
    List(Vec<Value<'a>>),
    /// Eagerly extracted sub-fields of one element
    Map(BTreeMap<String, Value<'a>>),
    /// Lazily extracted sub-fields of one element
    Group(GroupView<'a>),
    /// A linked page, not yet fetched
    Page(Page),
}

impl<'a> Value<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Date of either date variant, in its local time
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(d) => Some(d.naive_local()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::DateTime(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value<'a>]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value<'a>>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupView<'a>> {
        match self {
            Value::Group(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Value::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn into_page(self) -> Option<Page> {
        match self {
            Value::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Value<'a>>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Apply `f` to a text value, leaving every other variant untouched.
    ///
    /// Convenient inside `cleanup` functions:
    /// `.cleanup(|v| v.map_text(|s| s.trim().to_string()))`.
    pub fn map_text<F>(self, f: F) -> Value<'a>
    where
        F: FnOnce(String) -> String,
    {
        match self {
            Value::Text(s) => Value::Text(f(s)),
            other => other,
        }
    }

    /// Render as JSON. Groups are materialised, linked pages become their URL.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        use serde_json::Value as Json;

        Ok(match self {
            Value::Null => Json::Null,
            Value::Text(s) => Json::String(s.clone()),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
            Value::Bool(b) => Json::Bool(*b),
            Value::Date(d) => Json::String(d.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Value::DateTime(d) => Json::String(d.to_rfc3339()),
            Value::List(items) => Json::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Map(map) => Json::Object(map_to_json(map)?),
            Value::Group(view) => Json::Object(map_to_json(&view.to_map()?)?),
            Value::Page(page) => Json::String(page.url().to_string()),
        })
    }
}

pub(crate) fn map_to_json(map: &BTreeMap<String, Value<'_>>) -> Result<Map<String, serde_json::Value>> {
    let mut out = Map::new();
    for (key, value) in map {
        out.insert(key.clone(), value.to_json()?);
    }
    Ok(out)
}

impl From<&str> for Value<'_> {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value<'_> {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value<'_> {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
