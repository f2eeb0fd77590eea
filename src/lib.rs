//! A library for normalizing, reconciling, and uploading research-artifact
//! metadata to the Figshare repository service.
//!
//! `figlib` is the headless core of a desktop Figshare client. It takes the
//! messy metadata that accumulates around a research file (values inferred
//! from the file itself, partial edits typed into a form, records fetched
//! back from the service) and turns it into a canonical, upload-safe
//! payload.
//!
//! # Key Features
//!
//! - **Best-effort normalization**: every metadata field has a coercion rule
//!   (string clamping, allow-list resolution, author shape normalization);
//!   malformed values are dropped rather than aborting the whole record, and
//!   every drop or rewrite is surfaced in a [`ValidationReport`].
//! - **Allow-list reconciliation**: categories and licenses are resolved
//!   against the enumerations the service publishes, by ID or display name.
//! - **Instrument-aware records**: files from known scanning-microscopy
//!   formats carry their own custom-field set and search-index schema,
//!   selected once from the file extension via [`ArticleKind`].
//! - **Session store and workers**: a locked in-memory [`ArticleStore`]
//!   shared between bulk load/scan/upload worker threads that report
//!   per-item progress over channels.
//! - **Local search index** (feature `index`, on by default): a
//!   named-schema wrapper over [tantivy](https://docs.rs/tantivy) mirroring
//!   each article's metadata for full-text search.
//!
//! # Basic Usage
//!
//! ```rust
//! use figlib::{Article, Normalizer, StaticClient};
//! use serde_json::{json, Map};
//!
//! let client = StaticClient::new()
//!     .with_category(10, "Physics")
//!     .with_license(1, "CC BY");
//! let normalizer = Normalizer::new(&client);
//!
//! // A local scanning-tunneling-microscopy file, recognised by extension.
//! let mut article = Article::local("scans/corral.Z_flat");
//!
//! let mut edits = Map::new();
//! edits.insert("description".into(), json!("Quantum corral topography"));
//! edits.insert("categories".into(), json!(["Physics"]));
//! edits.insert("license".into(), json!("CC BY"));
//! edits.insert("authors".into(), json!([42, "D. M. Eigler"]));
//! article.update(&edits, &normalizer).unwrap();
//!
//! let payload = article.upload_dict(&normalizer).unwrap();
//! assert_eq!(payload["categories"], json!([10]));
//! assert_eq!(payload["license"], json!("1"));
//! assert_eq!(
//!     payload["authors"],
//!     json!([{"id": 42}, {"name": "D. M. Eigler"}])
//! );
//! ```
//!
//! # Validation Reports
//!
//! Normalization never rejects a record, but it does not discard silently
//! either:
//!
//! ```rust
//! use figlib::{ArticleMetadata, Normalizer, StaticClient};
//! use serde_json::json;
//!
//! let client = StaticClient::new().with_category(10, "Physics");
//! let normalizer = Normalizer::new(&client);
//!
//! let mut meta = ArticleMetadata::default();
//! meta.references = Some(json!(["http://doi.org/x", "ftp://elsewhere"]));
//! let report = normalizer.validate(&mut meta).unwrap();
//!
//! assert_eq!(report.dropped_fields(), vec!["references"]);
//! assert_eq!(meta.references, Some(json!(["http://doi.org/x"])));
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return the crate [`Result`] wrapping
//! [`ArticleError`]. Coercion failures never error; only transport
//! failures from the remote service and structurally unanticipated input
//! (see [`ArticleError::InvalidFieldValue`]) propagate to the caller.
//!
//! # Thread Safety
//!
//! [`ArticleStore`] is internally locked and is shared across worker
//! threads behind an `Arc`; see the [`worker`] module. The normalizer
//! itself is stateless apart from its borrowed client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod article;
pub mod client;
pub mod files;
#[cfg(feature = "index")]
pub mod index;
pub mod kind;
pub mod normalize;
pub mod store;
mod utils;
pub mod worker;

// Reexports
pub use article::Article;
pub use client::{Category, FigshareClient, License, StaticClient};
#[cfg(feature = "index")]
pub use index::ArticleIndex;
pub use kind::{ArticleKind, IndexFieldType};
pub use normalize::{merge, Normalizer, ValidationReport};
pub use store::ArticleStore;

/// A specialized Result type for article-metadata operations.
pub type Result<T> = std::result::Result<T, ArticleError>;

/// Represents errors that can occur while managing article metadata.
#[derive(Error, Debug)]
pub enum ArticleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid field value: {field} - {message}")]
    InvalidFieldValue { field: String, message: String },

    #[error("unknown article: {0}")]
    UnknownArticle(String),

    #[error("index error: {0}")]
    Index(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("Error: {0}")]
    Other(String),
}

#[cfg(feature = "index")]
impl From<tantivy::TantivyError> for ArticleError {
    fn from(err: tantivy::TantivyError) -> Self {
        ArticleError::Index(err.to_string())
    }
}

#[cfg(feature = "index")]
impl From<tantivy::query::QueryParserError> for ArticleError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        ArticleError::Query(err.to_string())
    }
}

/// A reference to an author, either by Figshare account ID or by free name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorRef {
    /// An existing Figshare account, `{"id": n}` on the wire.
    Id { id: i64 },
    /// A plain author name, `{"name": s}` on the wire.
    Name { name: String },
}

impl AuthorRef {
    pub fn id(id: i64) -> Self {
        AuthorRef::Id { id }
    }

    pub fn name(name: impl Into<String>) -> Self {
        AuthorRef::Name { name: name.into() }
    }
}

/// The fixed set of artifact types Figshare accepts for `defined_type`.
///
/// The service also accepts the 1-based position in this list; see
/// [`DefinedType::from_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinedType {
    Figure,
    Media,
    Dataset,
    Fileset,
    Poster,
    Paper,
    Presentation,
    Thesis,
    Code,
    Metadata,
}

impl DefinedType {
    const ALL: [DefinedType; 10] = [
        DefinedType::Figure,
        DefinedType::Media,
        DefinedType::Dataset,
        DefinedType::Fileset,
        DefinedType::Poster,
        DefinedType::Paper,
        DefinedType::Presentation,
        DefinedType::Thesis,
        DefinedType::Code,
        DefinedType::Metadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DefinedType::Figure => "figure",
            DefinedType::Media => "media",
            DefinedType::Dataset => "dataset",
            DefinedType::Fileset => "fileset",
            DefinedType::Poster => "poster",
            DefinedType::Paper => "paper",
            DefinedType::Presentation => "presentation",
            DefinedType::Thesis => "thesis",
            DefinedType::Code => "code",
            DefinedType::Metadata => "metadata",
        }
    }

    /// Resolves the 1-based index the service uses in its type combo.
    pub fn from_index(index: i64) -> Option<Self> {
        if (1..=10).contains(&index) {
            Some(Self::ALL[(index - 1) as usize])
        } else {
            None
        }
    }
}

impl std::str::FromStr for DefinedType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

impl std::fmt::Display for DefinedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the local copy of a published article matches the public one.
///
/// Records that have never been published carry the `Unpublished` sentinel
/// instead of a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    UpToDate,
    Stale,
    Unpublished,
}

impl Freshness {
    /// The loose value stored in the record's `up_to_date` slot.
    pub fn to_value(self) -> Value {
        match self {
            Freshness::UpToDate => Value::Bool(true),
            Freshness::Stale => Value::Bool(false),
            Freshness::Unpublished => Value::String("Unpublished".into()),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(Freshness::UpToDate),
            Value::Bool(false) => Some(Freshness::Stale),
            Value::String(s) if s == "Unpublished" => Some(Freshness::Unpublished),
            _ => None,
        }
    }
}

/// One article's Figshare-facing metadata record.
///
/// Every field is a loose slot: `None` means absent, and a present value may
/// hold whatever shape the source supplied (a raw remote record, a file
/// inspection, a half-typed form edit) until [`Normalizer::validate`]
/// coerces it into canonical form. After validation the slots contain only
/// values the service's create/update calls accept.
///
/// [`Normalizer::validate`]: crate::normalize::Normalizer::validate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    /// Article title, 3 to 500 characters once canonical.
    pub title: Option<Value>,
    /// Article ID (numeric once uploaded, `local_*` before).
    pub id: Option<Value>,
    /// Free-text description.
    pub description: Option<Value>,
    /// Tag strings, order preserved.
    pub tags: Option<Value>,
    /// Reference URLs.
    pub references: Option<Value>,
    /// Category IDs from the service's allow-list.
    pub categories: Option<Value>,
    /// Author references, `{"id": n}` or `{"name": s}`.
    pub authors: Option<Value>,
    /// One of the ten fixed artifact type strings.
    pub defined_type: Option<Value>,
    /// Funding acknowledgements.
    pub funding: Option<Value>,
    /// License value from the service's allow-list.
    pub license: Option<Value>,
    pub size: Option<Value>,
    pub version: Option<Value>,
    pub created_date: Option<Value>,
    pub modified_date: Option<Value>,
    pub published_date: Option<Value>,
    /// Freshness flag; see [`Freshness`].
    pub up_to_date: Option<Value>,
    /// `"local"`, `"draft"`, or `"public"`.
    pub status: Option<Value>,
    pub group_id: Option<Value>,
}

impl ArticleMetadata {
    /// Every known field name, in record order.
    pub const FIELDS: [&'static str; 18] = [
        "title",
        "id",
        "description",
        "tags",
        "references",
        "categories",
        "authors",
        "defined_type",
        "funding",
        "license",
        "size",
        "version",
        "created_date",
        "modified_date",
        "published_date",
        "up_to_date",
        "status",
        "group_id",
    ];

    /// Borrow the slot for a known field name.
    pub fn slot(&self, field: &str) -> Option<&Option<Value>> {
        match field {
            "title" => Some(&self.title),
            "id" => Some(&self.id),
            "description" => Some(&self.description),
            "tags" => Some(&self.tags),
            "references" => Some(&self.references),
            "categories" => Some(&self.categories),
            "authors" => Some(&self.authors),
            "defined_type" => Some(&self.defined_type),
            "funding" => Some(&self.funding),
            "license" => Some(&self.license),
            "size" => Some(&self.size),
            "version" => Some(&self.version),
            "created_date" => Some(&self.created_date),
            "modified_date" => Some(&self.modified_date),
            "published_date" => Some(&self.published_date),
            "up_to_date" => Some(&self.up_to_date),
            "status" => Some(&self.status),
            "group_id" => Some(&self.group_id),
            _ => None,
        }
    }

    /// Mutably borrow the slot for a known field name.
    pub fn slot_mut(&mut self, field: &str) -> Option<&mut Option<Value>> {
        match field {
            "title" => Some(&mut self.title),
            "id" => Some(&mut self.id),
            "description" => Some(&mut self.description),
            "tags" => Some(&mut self.tags),
            "references" => Some(&mut self.references),
            "categories" => Some(&mut self.categories),
            "authors" => Some(&mut self.authors),
            "defined_type" => Some(&mut self.defined_type),
            "funding" => Some(&mut self.funding),
            "license" => Some(&mut self.license),
            "size" => Some(&mut self.size),
            "version" => Some(&mut self.version),
            "created_date" => Some(&mut self.created_date),
            "modified_date" => Some(&mut self.modified_date),
            "published_date" => Some(&mut self.published_date),
            "up_to_date" => Some(&mut self.up_to_date),
            "status" => Some(&mut self.status),
            "group_id" => Some(&mut self.group_id),
            _ => None,
        }
    }

    /// The field's value, flattened; `None` when absent or unknown.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.slot(field).and_then(|slot| slot.as_ref())
    }

    pub fn title_str(&self) -> Option<&str> {
        self.title.as_ref().and_then(Value::as_str)
    }

    pub fn status_str(&self) -> Option<&str> {
        self.status.as_ref().and_then(Value::as_str)
    }

    pub fn is_public(&self) -> bool {
        self.status_str() == Some("public")
    }

    /// The numeric article ID, once the record exists on the service.
    pub fn id_i64(&self) -> Option<i64> {
        match self.id.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn freshness(&self) -> Option<Freshness> {
        self.up_to_date.as_ref().and_then(Freshness::from_value)
    }

    /// The canonical author list, once validated.
    pub fn authors(&self) -> Vec<AuthorRef> {
        match &self.authors {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn defined_type(&self) -> Option<DefinedType> {
        self.defined_type
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

/// Desktop-only sidecar metadata, never part of an upload payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesktopMetadata {
    /// Local file path, or `"Figshare"` for remote-only records.
    pub location: Option<String>,
    /// Path to a generated thumbnail image.
    pub thumb: Option<String>,
    /// Last known modification date of the public copy.
    pub public_modified_date: Option<String>,
}
