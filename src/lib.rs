//! Declarative, lazily-fetched page schemas
//!
//! A [`Schema`] names the fields of one kind of page, each bound to a CSS
//! selector. A [`Page`] binds a schema to a URL. Its document is fetched
//! on the first field read and then reused:
//! - text and attributes ([`Field::css`])
//! - typed values ([`Field::int`], [`Field::float`], [`Field::date`], [`Field::boolean`])
//! - raw markup ([`Field::raw`])
//! - compound values ([`Field::group`], [`Field::record`])
//! - links to other pages ([`Field::link`]), with referer propagation
//!
//! ```ignore
//! use lazyscrape::{Field, Schema, Session};
//!
//! let session = Session::http();
//! let overview = session.register(
//!     Schema::builder("Overview")
//!         .url("https://github.com/{username}")
//!         .arg("username")
//!         .field("repos", Field::link(".repo-list-name a", "Project").multiple())
//!         .build()?,
//! );
//!
//! let page = session.page(&overview).arg("python").build()?;
//! for repo in page.get("repos")?.into_list().unwrap_or_default() {
//!     println!("{}", repo.as_page().unwrap());
//! }
//! ```

pub mod error;
pub mod fields;
pub mod page;
pub mod provider;
pub mod registry;
pub mod schema;
pub mod value;

pub use error::{FetchError, Result, ScrapeError};
pub use fields::{Field, FieldBuilder, GroupView, LinkTarget, Referer};
pub use page::{Page, PageBuilder, Session};
pub use provider::{
    get_header, merge_headers, set_header, DocumentProvider, FetchRecord, Headers, HttpConfig,
    HttpProvider, MemoryProvider, DEFAULT_USER_AGENT,
};
pub use registry::Registry;
pub use schema::{Schema, SchemaBuilder};
pub use value::Value;
