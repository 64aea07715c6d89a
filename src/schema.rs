//! Page schemas
//!
//! A [`Schema`] declares what one kind of page looks like: where it lives
//! (a URL template with named arguments), which headers to send, and which
//! fields to extract.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Result, ScrapeError};
use crate::fields::{Field, FieldBuilder};
use crate::provider::{set_header, Headers};

#[derive(Debug)]
pub struct Schema {
    name: String,
    url: Option<UrlTemplate>,
    args: Vec<String>,
    defaults: BTreeMap<String, String>,
    headers: Headers,
    fields: Vec<(String, Field)>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            url: None,
            args: Vec::new(),
            defaults: BTreeMap::new(),
            headers: Headers::new(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url_template(&self) -> Option<&str> {
        self.url.as_ref().map(|t| t.source.as_str())
    }

    /// Names bound to positional arguments, in order
    pub fn arg_names(&self) -> &[String] {
        &self.args
    }

    pub fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, field)| field)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Interpolate the URL template with bound arguments
    pub(crate) fn render_url(&self, args: &BTreeMap<String, String>) -> Result<String> {
        match &self.url {
            Some(template) => template.render(args),
            None => Err(ScrapeError::MissingUrl(self.name.clone())),
        }
    }
}

pub struct SchemaBuilder {
    name: String,
    url: Option<String>,
    args: Vec<String>,
    defaults: BTreeMap<String, String>,
    headers: Headers,
    fields: Vec<(String, FieldBuilder)>,
}

impl SchemaBuilder {
    /// URL template; `{name}` is replaced by the argument `name`,
    /// `{{` and `}}` are literal braces
    pub fn url(mut self, template: impl Into<String>) -> Self {
        self.url = Some(template.into());
        self
    }

    /// Declare the next positional argument
    pub fn arg(mut self, name: impl Into<String>) -> Self {
        self.args.push(name.into());
        self
    }

    pub fn default_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// Header sent when fetching pages of this schema. Names are
    /// case-insensitive; a later call replaces an earlier one.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name, value);
        self
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldBuilder) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    pub fn build(self) -> Result<Schema> {
        let url = self.url.as_deref().map(UrlTemplate::parse).transpose()?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, builder) in self.fields {
            if !seen.insert(name.clone()) {
                return Err(ScrapeError::DuplicateField(name));
            }
            fields.push((name, builder.build()?));
        }

        Ok(Schema {
            name: self.name,
            url,
            args: self.args,
            defaults: self.defaults,
            headers: self.headers,
            fields,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone)]
struct UrlTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    fn parse(template: &str) -> Result<Self> {
        let invalid = || ScrapeError::InvalidTemplate(template.to_string());

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) if c.is_alphanumeric() || c == '_' || c == '-' => name.push(c),
                            _ => return Err(invalid()),
                        }
                    }
                    if name.is_empty() {
                        return Err(invalid());
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => return Err(invalid()),
                c => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    fn render(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let mut url = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Placeholder(name) => {
                    let value = args
                        .get(name)
                        .ok_or_else(|| ScrapeError::MissingArgument(name.clone()))?;
                    url.push_str(value);
                }
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_template_render() {
        let template = UrlTemplate::parse("https://github.com/{username}/{project}/").unwrap();
        let url = template
            .render(&args(&[("username", "python"), ("project", "cpython")]))
            .unwrap();
        assert_eq!(url, "https://github.com/python/cpython/");
    }

    #[test]
    fn test_template_without_placeholders() {
        let template = UrlTemplate::parse("http://fake-host/test.html").unwrap();
        assert_eq!(
            template.segments,
            vec![Segment::Literal("http://fake-host/test.html".to_string())]
        );
        assert_eq!(template.render(&BTreeMap::new()).unwrap(), "http://fake-host/test.html");
    }

    #[test]
    fn test_template_escaped_braces() {
        let template = UrlTemplate::parse("http://h/{{raw}}/{id}").unwrap();
        assert_eq!(template.render(&args(&[("id", "7")])).unwrap(), "http://h/{raw}/7");
    }

    #[test]
    fn test_template_missing_argument() {
        let template = UrlTemplate::parse("http://h/{user}").unwrap();
        let err = template.render(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingArgument(ref name) if name == "user"));
    }

    #[test]
    fn test_template_malformed() {
        for bad in ["http://h/{user", "http://h/{}", "http://h/}", "http://h/{a b}"] {
            assert!(
                matches!(UrlTemplate::parse(bad), Err(ScrapeError::InvalidTemplate(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_duplicate_field() {
        let err = Schema::builder("Page")
            .url("http://h/")
            .field("foo", Field::css("h1"))
            .field("foo", Field::css("h2"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ScrapeError::DuplicateField(ref name) if name == "foo"));
    }

    #[test]
    fn test_field_order_is_declaration_order() {
        let schema = Schema::builder("Page")
            .url("http://h/")
            .field("zeta", Field::css("h1"))
            .field("alpha", Field::css("h2"))
            .build()
            .unwrap();
        assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(schema.field("alpha").unwrap().selector(), "h2");
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_missing_url() {
        let schema = Schema::builder("NoUrl").build().unwrap();
        assert!(schema.url_template().is_none());
        let err = schema.render_url(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingUrl(ref name) if name == "NoUrl"));
    }
}
