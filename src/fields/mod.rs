//! Field descriptors
//!
//! A [`Field`] binds a CSS selector to an extraction pipeline. Fields are
//! declared through a [`FieldBuilder`] and are immutable once built.
//!
//! Every matched element goes through the same steps, in order:
//! raw extraction, user cleanup, post-processing hook, then the coercion
//! belonging to the field's kind.

mod group;
mod link;
mod raw;
mod typed;

pub use group::GroupView;
pub use link::{LinkTarget, Referer};

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use chrono::FixedOffset;
use scraper::{ElementRef, Html, Selector};
use tracing::trace;

use crate::error::{Result, ScrapeError};
use crate::page::Page;
use crate::value::Value;

/// Raw extraction override: element to raw value
pub type ExtractFn = Rc<dyn for<'a> Fn(ElementRef<'a>) -> Value<'a>>;
/// User cleanup: raw value to cleaned value
pub type CleanupFn = Rc<dyn for<'a> Fn(Value<'a>) -> Value<'a>>;
/// Post-processing hook: (page, cleaned value, element) to final value
pub type HookFn = Rc<dyn for<'a> Fn(&'a Page, Value<'a>, ElementRef<'a>) -> Value<'a>>;

pub(crate) type Subfields = BTreeMap<String, Field>;

/// Where the raw value of a matched element comes from
enum Source {
    Text,
    Attribute(String),
    Extract(ExtractFn),
}

/// Field kind. `S` holds the sub-fields of group and record kinds:
/// declared builders before [`FieldBuilder::build`], built fields after.
enum Kind<S = Subfields> {
    Text,
    Int,
    Float,
    Date {
        format: String,
        timezone: Option<FixedOffset>,
    },
    Boolean,
    Raw {
        include_tag: bool,
    },
    Group(S),
    Record(S),
    Link {
        target: LinkTarget,
        referer: Referer,
    },
}

/// Kind configuration before sub-fields are built
type KindSpec = Kind<Vec<(String, FieldBuilder)>>;

impl<S> Kind<S> {
    fn name(&self) -> &'static str {
        match self {
            Kind::Text => "css",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Date { .. } => "date",
            Kind::Boolean => "boolean",
            Kind::Raw { .. } => "raw",
            Kind::Group(_) => "group",
            Kind::Record(_) => "record",
            Kind::Link { .. } => "link",
        }
    }

    /// Kinds that produce their own raw value from the element
    fn owns_extraction(&self) -> bool {
        matches!(self, Kind::Raw { .. } | Kind::Group(_) | Kind::Record(_))
    }
}

/// The elements a selector runs against: the whole document, or the
/// descendants of one element (for group sub-fields).
#[derive(Clone, Copy)]
pub(crate) enum Scope<'a> {
    Document(&'a Html),
    Element(ElementRef<'a>),
}

impl<'a> Scope<'a> {
    fn select(self, selector: &'a Selector) -> Box<dyn Iterator<Item = ElementRef<'a>> + 'a> {
        match self {
            Scope::Document(document) => Box::new(document.select(selector)),
            Scope::Element(element) => Box::new(element.select(selector)),
        }
    }
}

/// A built field declaration
pub struct Field {
    css: String,
    selector: Selector,
    source: Source,
    cleanup: Option<CleanupFn>,
    hook: Option<HookFn>,
    multiple: bool,
    kind: Kind,
}

impl Field {
    /// Text content (or an attribute) of the matched element
    pub fn css(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(selector, KindSpec::Text)
    }

    /// Value parsed as `i64`; `Null` when it does not parse
    pub fn int(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(selector, KindSpec::Int)
    }

    /// Value parsed as `f64`; `Null` when it does not parse
    pub fn float(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(selector, KindSpec::Float)
    }

    /// Value parsed with a strftime-style `format`
    pub fn date(selector: impl Into<String>, format: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(
            selector,
            KindSpec::Date {
                format: format.into(),
                timezone: None,
            },
        )
    }

    /// `true` when the selector matches, `false` otherwise
    pub fn boolean(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(selector, KindSpec::Boolean)
    }

    /// Inner markup of the matched element
    pub fn raw(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(selector, KindSpec::Raw { include_tag: false })
    }

    /// Lazy per-element view over named sub-fields
    pub fn group(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(selector, KindSpec::Group(Vec::new()))
    }

    /// Eager per-element map of named sub-fields, always multiple
    pub fn record(selector: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(selector, KindSpec::Record(Vec::new()))
    }

    /// A new page of `target`, built from the matched element's `href`
    pub fn link(selector: impl Into<String>, target: impl Into<LinkTarget>) -> FieldBuilder {
        FieldBuilder::new(
            selector,
            KindSpec::Link {
                target: target.into(),
                referer: Referer::default(),
            },
        )
    }

    pub fn selector(&self) -> &str {
        &self.css
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Names of the sub-fields of a group or record field
    pub fn subfield_names(&self) -> Vec<&str> {
        match &self.kind {
            Kind::Group(subfields) | Kind::Record(subfields) => {
                subfields.keys().map(String::as_str).collect()
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn get<'a>(&'a self, scope: Scope<'a>, page: &'a Page) -> Result<Value<'a>> {
        trace!(selector = %self.css, multiple = self.multiple, "extracting field");

        let mut elements = scope.select(&self.selector);

        if self.multiple {
            let mut values = Vec::new();
            for element in elements {
                let value = self.extract(element, page)?;
                if !value.is_null() {
                    values.push(value);
                }
            }
            return Ok(Value::List(values));
        }

        let value = match elements.next() {
            Some(element) => self.extract(element, page)?,
            None => Value::Null,
        };

        // A boolean field answers "did anything match", never "no value"
        match (&self.kind, value) {
            (Kind::Boolean, Value::Null) => Ok(Value::Bool(false)),
            (_, value) => Ok(value),
        }
    }

    fn extract<'a>(&'a self, element: ElementRef<'a>, page: &'a Page) -> Result<Value<'a>> {
        let raw = match &self.kind {
            Kind::Raw { include_tag } => raw::serialize(element, *include_tag),
            Kind::Group(subfields) => Value::Group(GroupView::new(page, element, subfields)),
            Kind::Record(subfields) => group::record(page, element, subfields)?,
            _ => match &self.source {
                Source::Text => Value::Text(element.text().collect()),
                Source::Attribute(name) => match element.value().attr(name) {
                    Some(value) => Value::Text(value.to_string()),
                    None => return Ok(Value::Null),
                },
                Source::Extract(extract) => extract(element),
            },
        };

        let mut value = raw;
        if let Some(cleanup) = &self.cleanup {
            value = cleanup(value);
        }
        if let Some(hook) = &self.hook {
            value = hook(page, value, element);
        }

        self.coerce(value, page)
    }

    /// Final step of the pipeline, always run on the cleanup chain's output
    fn coerce<'a>(&'a self, value: Value<'a>, page: &'a Page) -> Result<Value<'a>> {
        Ok(match &self.kind {
            Kind::Int => typed::to_int(value),
            Kind::Float => typed::to_float(value),
            Kind::Date { format, timezone } => typed::to_date(value, format, *timezone),
            Kind::Boolean => typed::to_bool(value),
            Kind::Link { target, referer } => return link::follow(value, target, referer, page),
            Kind::Text | Kind::Raw { .. } | Kind::Group(_) | Kind::Record(_) => value,
        })
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Text => "text".to_string(),
            Source::Attribute(name) => format!("@{}", name),
            Source::Extract(_) => "extract fn".to_string(),
        };
        f.debug_struct("Field")
            .field("kind", &self.kind.name())
            .field("selector", &self.css)
            .field("source", &source)
            .field("multiple", &self.multiple)
            .field("cleanup", &self.cleanup.is_some())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// Declaration of a [`Field`]; validated by [`FieldBuilder::build`]
pub struct FieldBuilder {
    css: String,
    kind: KindSpec,
    extract: Option<ExtractFn>,
    attribute: Option<String>,
    cleanup: Option<CleanupFn>,
    hook: Option<HookFn>,
    multiple: bool,
    misuse: Option<&'static str>,
}

impl FieldBuilder {
    fn new(selector: impl Into<String>, kind: KindSpec) -> Self {
        Self {
            css: selector.into(),
            kind,
            extract: None,
            attribute: None,
            cleanup: None,
            hook: None,
            multiple: false,
            misuse: None,
        }
    }

    /// Read this attribute instead of the text content.
    /// Elements without the attribute yield no value.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    /// Replace raw extraction with `f`
    pub fn extract<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(ElementRef<'a>) -> Value<'a> + 'static,
    {
        self.extract = Some(Rc::new(f));
        self
    }

    pub fn cleanup<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(Value<'a>) -> Value<'a> + 'static,
    {
        self.cleanup = Some(Rc::new(f));
        self
    }

    /// Attach a post-processing hook, run after `cleanup` with the owning
    /// page and the source element
    pub fn hook<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a Page, Value<'a>, ElementRef<'a>) -> Value<'a> + 'static,
    {
        self.hook = Some(Rc::new(f));
        self
    }

    /// Return every match instead of the first one
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Raw fields only: serialise the element's own tag as well
    pub fn include_tag(mut self) -> Self {
        match &mut self.kind {
            KindSpec::Raw { include_tag } => *include_tag = true,
            _ => self.misuse = self.misuse.or(Some("include_tag")),
        }
        self
    }

    /// Date fields only: attach a fixed offset to parsed dates
    pub fn timezone(mut self, offset: FixedOffset) -> Self {
        match &mut self.kind {
            KindSpec::Date { timezone, .. } => *timezone = Some(offset),
            _ => self.misuse = self.misuse.or(Some("timezone")),
        }
        self
    }

    /// Link fields only: referer policy of the linked page
    pub fn referer(mut self, policy: impl Into<Referer>) -> Self {
        match &mut self.kind {
            KindSpec::Link { referer, .. } => *referer = policy.into(),
            _ => self.misuse = self.misuse.or(Some("referer")),
        }
        self
    }

    /// Group and record fields only: declare a sub-field evaluated
    /// relative to each matched element
    pub fn subfield(mut self, name: impl Into<String>, field: FieldBuilder) -> Self {
        match &mut self.kind {
            KindSpec::Group(subfields) | KindSpec::Record(subfields) => {
                subfields.push((name.into(), field))
            }
            _ => self.misuse = self.misuse.or(Some("subfield")),
        }
        self
    }

    pub fn build(self) -> Result<Field> {
        let FieldBuilder {
            css,
            kind,
            extract,
            attribute,
            cleanup,
            hook,
            multiple,
            misuse,
        } = self;

        if let Some(option) = misuse {
            return Err(ScrapeError::UnsupportedOption {
                kind: kind.name(),
                option,
            });
        }

        if kind.owns_extraction() {
            let option = match (&extract, &attribute) {
                (Some(_), _) => Some("extract"),
                (None, Some(_)) => Some("attribute"),
                (None, None) => None,
            };
            if let Some(option) = option {
                return Err(ScrapeError::UnsupportedOption {
                    kind: kind.name(),
                    option,
                });
            }
        }

        let attribute = match &kind {
            KindSpec::Link { .. } => Some(attribute.unwrap_or_else(|| "href".to_string())),
            _ => attribute,
        };

        let source = match (extract, attribute) {
            (Some(_), Some(_)) => return Err(ScrapeError::ConflictingSource(css)),
            (Some(f), None) => Source::Extract(f),
            (None, Some(name)) => Source::Attribute(name),
            (None, None) => Source::Text,
        };

        let selector = Selector::parse(&css).map_err(|e| ScrapeError::InvalidSelector {
            selector: css.clone(),
            message: e.to_string(),
        })?;

        let multiple = multiple || matches!(kind, KindSpec::Record(_));

        let kind = match kind {
            KindSpec::Text => Kind::Text,
            KindSpec::Int => Kind::Int,
            KindSpec::Float => Kind::Float,
            KindSpec::Date { format, timezone } => Kind::Date { format, timezone },
            KindSpec::Boolean => Kind::Boolean,
            KindSpec::Raw { include_tag } => Kind::Raw { include_tag },
            KindSpec::Group(subfields) => Kind::Group(build_subfields(subfields)?),
            KindSpec::Record(subfields) => Kind::Record(build_subfields(subfields)?),
            KindSpec::Link { target, referer } => Kind::Link { target, referer },
        };

        Ok(Field {
            css,
            selector,
            source,
            cleanup,
            hook,
            multiple,
            kind,
        })
    }
}

fn build_subfields(declared: Vec<(String, FieldBuilder)>) -> Result<Subfields> {
    let mut subfields = Subfields::new();
    for (name, builder) in declared {
        let field = builder.build()?;
        if subfields.insert(name.clone(), field).is_some() {
            return Err(ScrapeError::DuplicateField(name));
        }
    }
    Ok(subfields)
}
