//! Article records.
//!
//! An [`Article`] bundles one artifact's Figshare metadata with its
//! desktop-only sidecar and, for instrument files, the custom-field map its
//! [`ArticleKind`] allows. Records come from three places: a fetched remote
//! record, a local file, or a partial edit merged onto an existing record.

use crate::client::FigshareClient;
use crate::kind::ArticleKind;
use crate::normalize::{merge, Normalizer};
use crate::utils::loose_str;
use crate::{ArticleError, ArticleMetadata, DesktopMetadata, Freshness, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// One research artifact tracked by the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub kind: ArticleKind,
    pub figshare: ArticleMetadata,
    pub desktop: DesktopMetadata,
    /// Custom instrument fields, allow-listed by the kind. Values are kept
    /// as strings, the format the service's custom-field rows use.
    pub custom: BTreeMap<String, String>,
}

impl Article {
    /// Builds a record from a raw remote record as fetched from the
    /// service.
    ///
    /// The kind is taken from the record's title (remote titles are file
    /// names for instrument uploads); `custom_fields` rows are flattened
    /// into the custom map. The location sidecar marks the record as
    /// remote-only.
    pub fn from_remote(raw: &Map<String, Value>) -> Self {
        let kind = raw
            .get("title")
            .and_then(Value::as_str)
            .map(ArticleKind::from_path)
            .unwrap_or_default();

        let mut article = Article {
            kind,
            ..Article::default()
        };
        merge(&mut article.figshare, raw);

        if let Some(Value::Array(rows)) = raw.get("custom_fields") {
            let flattened = Self::recreate_custom_fields(rows);
            article.merge_custom(&flattened);
        }

        article.desktop.location = Some("Figshare".to_string());
        article
    }

    /// Builds a record for a file that only exists locally.
    ///
    /// The title is the file name, the status is `"local"`, and the
    /// location sidecar holds the absolute path.
    pub fn local(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut article = Article {
            kind: ArticleKind::from_path(path),
            ..Article::default()
        };
        article.figshare.title = Some(Value::String(title));
        article.figshare.status = Some(Value::String("local".into()));
        article.desktop.location = Some(absolute.display().to_string());
        article
    }

    /// Flattens the service's `custom_fields` rows (`{"name": .., "value":
    /// ..}`) into a plain map.
    pub fn recreate_custom_fields(rows: &[Value]) -> Map<String, Value> {
        let mut flattened = Map::new();
        for row in rows {
            if let (Some(name), Some(value)) = (
                row.get("name").and_then(Value::as_str),
                row.get("value"),
            ) {
                flattened.insert(name.to_string(), value.clone());
            }
        }
        flattened
    }

    /// Copies allow-listed custom fields from a partial update.
    ///
    /// Unknown keys are ignored; null and `"None"` values leave existing
    /// entries untouched, like [`merge`] does for the base record.
    pub fn merge_custom(&mut self, partial: &Map<String, Value>) {
        for (key, value) in partial {
            if value.is_null() || value.as_str() == Some("None") {
                continue;
            }
            if self.kind.custom_field_names().any(|name| name == key.as_str()) {
                self.custom.insert(key.clone(), loose_str(value));
            }
        }
    }

    /// Applies a partial edit to both the base record and the custom map,
    /// then validates.
    pub fn update<C: FigshareClient>(
        &mut self,
        partial: &Map<String, Value>,
        normalizer: &Normalizer<'_, C>,
    ) -> Result<crate::ValidationReport> {
        merge(&mut self.figshare, partial);
        self.merge_custom(partial);
        normalizer.validate(&mut self.figshare)
    }

    /// Validates, then builds the create/update payload.
    ///
    /// For instrument kinds the custom values are nested under
    /// `custom_fields`, each coerced to a string.
    pub fn upload_dict<C: FigshareClient>(
        &mut self,
        normalizer: &Normalizer<'_, C>,
    ) -> Result<Map<String, Value>> {
        let mut payload = normalizer.upload_dict(&mut self.figshare)?;

        if self.kind.has_custom_fields() {
            let mut custom = Map::new();
            for (key, value) in &self.custom {
                custom.insert(key.clone(), Value::String(value.clone()));
            }
            payload.insert("custom_fields".into(), Value::Object(custom));
        }
        Ok(payload)
    }

    /// Refreshes the freshness flag against the public copy.
    ///
    /// Public records fetch the public copy's modified date into the
    /// sidecar and compare it with the record's own; everything else gets
    /// the `Unpublished` sentinel without touching the network.
    pub fn check_uptodate<C: FigshareClient>(&mut self, client: &C) -> Result<Freshness> {
        let freshness = if self.figshare.is_public() {
            let article_id = self.figshare.id_i64().ok_or_else(|| {
                ArticleError::InvalidFieldValue {
                    field: "id".into(),
                    message: "public record without a numeric article ID".into(),
                }
            })?;
            let public_date = client.public_modified_date(article_id)?;
            debug!(article_id, %public_date, "fetched public modified date");

            let local_date = self
                .figshare
                .modified_date
                .as_ref()
                .map(loose_str);
            let fresh = local_date.as_deref() == Some(public_date.as_str());
            self.desktop.public_modified_date = Some(public_date);
            if fresh {
                Freshness::UpToDate
            } else {
                Freshness::Stale
            }
        } else {
            Freshness::Unpublished
        };

        self.figshare.up_to_date = Some(freshness.to_value());
        Ok(freshness)
    }

    /// One flat string map of every set field, for the search index.
    pub fn index_document(&self) -> BTreeMap<String, String> {
        let mut document = BTreeMap::new();
        for field in ArticleMetadata::FIELDS {
            if let Some(value) = self.figshare.get(field) {
                document.insert(field.to_string(), loose_str(value));
            }
        }
        if let Some(location) = &self.desktop.location {
            document.insert("location".into(), location.clone());
        }
        if let Some(thumb) = &self.desktop.thumb {
            document.insert("thumb".into(), thumb.clone());
        }
        for (key, value) in &self.custom {
            document.insert(key.clone(), value.clone());
        }
        document
    }
}
