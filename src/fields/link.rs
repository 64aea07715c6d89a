//! Link following
//!
//! A link field turns the matched element's `href` into a new, unfetched
//! [`Page`] of the target schema.

use std::fmt;
use std::rc::Rc;

use tracing::trace;
use url::Url;

use crate::error::Result;
use crate::page::Page;
use crate::schema::Schema;
use crate::value::Value;

/// Schema of the pages a link field produces
#[derive(Clone)]
pub enum LinkTarget {
    Schema(Rc<Schema>),
    /// Looked up in the session registry when the link is followed, so the
    /// schema may be registered after the field is declared
    Named(String),
}

impl fmt::Debug for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkTarget::Schema(schema) => f.debug_tuple("Schema").field(&schema.name()).finish(),
            LinkTarget::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

impl From<&str> for LinkTarget {
    fn from(name: &str) -> Self {
        LinkTarget::Named(name.to_string())
    }
}

impl From<String> for LinkTarget {
    fn from(name: String) -> Self {
        LinkTarget::Named(name)
    }
}

impl From<Rc<Schema>> for LinkTarget {
    fn from(schema: Rc<Schema>) -> Self {
        LinkTarget::Schema(schema)
    }
}

impl From<&Rc<Schema>> for LinkTarget {
    fn from(schema: &Rc<Schema>) -> Self {
        LinkTarget::Schema(Rc::clone(schema))
    }
}

/// Referer sent when a linked page is fetched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Referer {
    /// The URL of the page the link was found on
    #[default]
    Auto,
    Off,
    Fixed(String),
}

impl From<bool> for Referer {
    fn from(enabled: bool) -> Self {
        if enabled {
            Referer::Auto
        } else {
            Referer::Off
        }
    }
}

impl From<&str> for Referer {
    fn from(referer: &str) -> Self {
        Referer::Fixed(referer.to_string())
    }
}

impl From<String> for Referer {
    fn from(referer: String) -> Self {
        Referer::Fixed(referer)
    }
}

pub(super) fn follow<'a>(
    value: Value<'a>,
    target: &LinkTarget,
    referer: &Referer,
    page: &'a Page,
) -> Result<Value<'a>> {
    let href = match value {
        Value::Text(href) => href,
        _ => return Ok(Value::Null),
    };

    let Some(url) = resolve_url(page.url(), &href) else {
        return Ok(Value::Null);
    };

    let schema = match target {
        LinkTarget::Schema(schema) => Rc::clone(schema),
        LinkTarget::Named(name) => page.session().registry().resolve(name)?,
    };

    let referer = match referer {
        Referer::Auto => Some(page.url().to_string()),
        Referer::Off => None,
        Referer::Fixed(referer) => Some(referer.clone()),
    };

    trace!(from = %page.url(), to = %url, schema = %schema.name(), "following link");

    Ok(Value::Page(Page::linked(page.session(), schema, url, referer)))
}

/// Resolve `href` against `base` the way a browser would
fn resolve_url(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(href.trim()).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("http://host/a/", "/b").as_deref(),
            Some("http://host/b")
        );
        assert_eq!(
            resolve_url("http://host/a/", "b").as_deref(),
            Some("http://host/a/b")
        );
        assert_eq!(
            resolve_url("http://host/a/", "https://other.org/x").as_deref(),
            Some("https://other.org/x")
        );
        assert_eq!(
            resolve_url("https://base.com/dir/page", " ../up ").as_deref(),
            Some("https://base.com/up")
        );
    }

    #[test]
    fn test_resolve_url_with_bad_base() {
        assert_eq!(resolve_url("not a url", "/b"), None);
    }

    #[test]
    fn test_referer_conversions() {
        assert_eq!(Referer::from(true), Referer::Auto);
        assert_eq!(Referer::from(false), Referer::Off);
        assert_eq!(Referer::from("http://no"), Referer::Fixed("http://no".to_string()));
        assert_eq!(Referer::default(), Referer::Auto);
    }
}
