//! Sessions and page instances
//!
//! A [`Session`] owns the document provider and the schema registry. Every
//! [`Page`] it creates shares that provider. A page fetches its document on
//! the first field access and keeps it for the rest of its life.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use scraper::Html;
use tracing::debug;

use crate::error::{Result, ScrapeError};
use crate::fields::Scope;
use crate::provider::{get_header, set_header, DocumentProvider, Headers, HttpProvider};
use crate::registry::Registry;
use crate::schema::Schema;
use crate::value::{map_to_json, Value};

struct SessionInner {
    provider: Box<dyn DocumentProvider>,
    registry: Registry,
}

/// Shared context for pages: one document provider, one schema registry.
///
/// Cloning is cheap; clones share both.
#[derive(Clone)]
pub struct Session {
    inner: Rc<SessionInner>,
}

impl Session {
    pub fn new<P>(provider: P) -> Self
    where
        P: DocumentProvider + 'static,
    {
        Self {
            inner: Rc::new(SessionInner {
                provider: Box::new(provider),
                registry: Registry::new(),
            }),
        }
    }

    /// Session over an [`HttpProvider`] with default settings
    pub fn http() -> Self {
        Self::new(HttpProvider::default())
    }

    pub fn provider(&self) -> &dyn DocumentProvider {
        self.inner.provider.as_ref()
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Register `schema` so link fields can refer to it by name
    pub fn register(&self, schema: Schema) -> Rc<Schema> {
        self.inner.registry.register(schema)
    }

    pub fn page(&self, schema: &Rc<Schema>) -> PageBuilder {
        PageBuilder {
            session: self.clone(),
            schema: Rc::clone(schema),
            positional: Vec::new(),
            keywords: BTreeMap::new(),
            url: None,
            referer: None,
        }
    }

    /// Like [`Session::page`], for a registered schema
    pub fn page_named(&self, name: &str) -> Result<PageBuilder> {
        let schema = self.inner.registry.resolve(name)?;
        Ok(self.page(&schema))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("schemas", &self.inner.registry.names())
            .finish()
    }
}

/// Arguments for a new [`Page`]
pub struct PageBuilder {
    session: Session,
    schema: Rc<Schema>,
    positional: Vec<String>,
    keywords: BTreeMap<String, String>,
    url: Option<String>,
    referer: Option<String>,
}

impl PageBuilder {
    /// Bind the next declared positional argument. Binding more values
    /// than the schema declares names fails in [`PageBuilder::build`]
    /// instead of dropping the extras.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    /// Use `url` verbatim instead of interpolating the schema's template
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// `Referer` header for the fetch; an empty string sends none
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Bind arguments and resolve the URL. Nothing is fetched yet.
    ///
    /// Defaults are overridden by keyword arguments, which are overridden
    /// by positional ones.
    pub fn build(self) -> Result<Page> {
        let names = self.schema.arg_names();
        if self.positional.len() > names.len() {
            return Err(ScrapeError::TooManyArguments {
                schema: self.schema.name().to_string(),
                expected: names.len(),
                given: self.positional.len(),
            });
        }

        let mut args = self.schema.defaults().clone();
        args.extend(self.keywords);
        args.extend(names.iter().cloned().zip(self.positional));

        let url = match self.url {
            Some(url) => url,
            None => self.schema.render_url(&args)?,
        };

        Ok(Page::create(self.session, self.schema, url, args, self.referer))
    }
}

/// One schema bound to one URL.
///
/// The document is fetched and parsed on the first [`Page::get`] and
/// reused by every later read, of any field.
#[derive(Clone)]
pub struct Page {
    session: Session,
    schema: Rc<Schema>,
    url: String,
    args: BTreeMap<String, String>,
    headers: Headers,
    document: OnceCell<Html>,
}

impl Page {
    fn create(
        session: Session,
        schema: Rc<Schema>,
        url: String,
        args: BTreeMap<String, String>,
        referer: Option<String>,
    ) -> Self {
        let mut headers = schema.headers().clone();
        if let Some(referer) = referer.filter(|r| !r.is_empty()) {
            set_header(&mut headers, "Referer", referer);
        }

        Self {
            session,
            schema,
            url,
            args,
            headers,
            document: OnceCell::new(),
        }
    }

    /// Page reached through a link field: explicit URL, no arguments
    pub(crate) fn linked(
        session: &Session,
        schema: Rc<Schema>,
        url: String,
        referer: Option<String>,
    ) -> Self {
        Self::create(session.clone(), schema, url, BTreeMap::new(), referer)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn schema(&self) -> &Rc<Schema> {
        &self.schema
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Headers sent when fetching, including any `Referer`
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn referer(&self) -> Option<&str> {
        get_header(&self.headers, "Referer")
    }

    /// Bound arguments, after defaults and overrides
    pub fn args(&self) -> &BTreeMap<String, String> {
        &self.args
    }

    pub fn is_fetched(&self) -> bool {
        self.document.get().is_some()
    }

    /// The parsed document, fetched on first use
    pub fn document(&self) -> Result<&Html> {
        if let Some(document) = self.document.get() {
            return Ok(document);
        }

        debug!(url = %self.url, schema = %self.schema.name(), "fetching page");
        let markup = self.fetch_raw()?;
        let document = self.session.provider().parse(&markup);

        Ok(self.document.get_or_init(|| document))
    }

    /// Fetch the markup with this page's headers, bypassing the cache
    pub fn fetch_raw(&self) -> Result<String> {
        Ok(self.session.provider().fetch(&self.url, &self.headers)?)
    }

    /// Extract a declared field
    pub fn get(&self, name: &str) -> Result<Value<'_>> {
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| ScrapeError::FieldNotFound(name.to_string()))?;
        let document = self.document()?;
        field.get(Scope::Document(document), self)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.schema.field_names()
    }

    /// Extract every declared field
    pub fn to_map(&self) -> Result<BTreeMap<String, Value<'_>>> {
        let document = self.document()?;
        let mut map = BTreeMap::new();
        for (name, field) in self.schema.fields() {
            map.insert(name.to_string(), field.get(Scope::Document(document), self)?);
        }
        Ok(map)
    }

    /// Every declared field as JSON; linked pages are rendered as their URL
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Object(map_to_json(&self.to_map()?)?))
    }
}

impl PartialEq for Page {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name()
            && self.url == other.url
            && self.headers == other.headers
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(url={:?})", self.schema.name(), self.url)
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("schema", &self.schema.name())
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("fetched", &self.is_fetched())
            .finish()
    }
}
