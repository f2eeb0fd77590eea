//! The remote service seam.
//!
//! Everything the metadata layer needs from Figshare goes through the
//! [`FigshareClient`] trait: allow-list fetches, record fetches, and the
//! create/update/upload calls. Implementations are expected to be blocking;
//! any failure is reported as [`ArticleError::Transport`] and propagates
//! untouched through the normalizer to the caller.
//!
//! The crate ships one implementation, [`StaticClient`], an in-memory
//! service double for offline use and tests. An HTTP client belongs to the
//! application embedding this crate.

use crate::{ArticleError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

/// One entry of the category allow-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub parent_id: Option<i64>,
}

/// One entry of the license allow-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub value: i64,
    pub name: String,
    pub url: Option<String>,
}

/// Blocking access to the remote repository service.
pub trait FigshareClient {
    /// Fetches the category allow-list.
    fn categories(&self) -> Result<Vec<Category>>;

    /// Fetches the license allow-list.
    fn licenses(&self) -> Result<Vec<License>>;

    /// Fetches one article's raw metadata record, including its
    /// `custom_fields` rows.
    fn get_article(&self, article_id: i64) -> Result<Map<String, Value>>;

    /// Fetches the last-modified date of the article's public copy.
    fn public_modified_date(&self, article_id: i64) -> Result<String>;

    /// Creates an article under a project from an upload payload and
    /// returns its new ID.
    fn create_article(&self, project_id: i64, payload: &Map<String, Value>) -> Result<i64>;

    /// Overwrites an existing article's metadata from an upload payload.
    fn update_article(&self, article_id: i64, payload: &Map<String, Value>) -> Result<()>;

    /// Attaches a local file to an article.
    fn upload_file(&self, article_id: i64, path: &Path) -> Result<()>;
}

/// An in-memory stand-in for the remote service.
///
/// Allow-lists are fixed at construction; created articles land in an
/// internal map so they can be fetched back. Useful for tests, examples,
/// and offline runs.
///
/// # Examples
///
/// ```
/// use figlib::{FigshareClient, StaticClient};
///
/// let client = StaticClient::new()
///     .with_category(1, "Physics")
///     .with_license(2, "MIT");
/// assert_eq!(client.categories().unwrap()[0].title, "Physics");
/// ```
#[derive(Debug, Default)]
pub struct StaticClient {
    categories: Vec<Category>,
    licenses: Vec<License>,
    articles: RwLock<HashMap<i64, Map<String, Value>>>,
    public_dates: HashMap<i64, String>,
    uploads: Mutex<Vec<(i64, String)>>,
    next_id: AtomicI64,
}

impl StaticClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_category(mut self, id: i64, title: &str) -> Self {
        self.categories.push(Category {
            id,
            title: title.to_string(),
            parent_id: None,
        });
        self
    }

    #[must_use]
    pub fn with_license(mut self, value: i64, name: &str) -> Self {
        self.licenses.push(License {
            value,
            name: name.to_string(),
            url: None,
        });
        self
    }

    /// Seeds a fetchable article record.
    #[must_use]
    pub fn with_article(self, article_id: i64, record: Map<String, Value>) -> Self {
        self.articles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(article_id, record);
        self
    }

    /// Seeds the public-copy modified date for an article.
    #[must_use]
    pub fn with_public_date(mut self, article_id: i64, date: &str) -> Self {
        self.public_dates.insert(article_id, date.to_string());
        self
    }

    /// Files uploaded through this client, in call order.
    pub fn uploads(&self) -> Vec<(i64, String)> {
        self.uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FigshareClient for StaticClient {
    fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.clone())
    }

    fn licenses(&self) -> Result<Vec<License>> {
        Ok(self.licenses.clone())
    }

    fn get_article(&self, article_id: i64) -> Result<Map<String, Value>> {
        self.articles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&article_id)
            .cloned()
            .ok_or_else(|| ArticleError::Transport(format!("no such article: {article_id}")))
    }

    fn public_modified_date(&self, article_id: i64) -> Result<String> {
        self.public_dates
            .get(&article_id)
            .cloned()
            .ok_or_else(|| ArticleError::Transport(format!("no public copy: {article_id}")))
    }

    fn create_article(&self, _project_id: i64, payload: &Map<String, Value>) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut record = payload.clone();
        record.insert("id".into(), Value::from(id));
        self.articles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, record);
        Ok(id)
    }

    fn update_article(&self, article_id: i64, payload: &Map<String, Value>) -> Result<()> {
        let mut articles = self
            .articles
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let record = articles
            .get_mut(&article_id)
            .ok_or_else(|| ArticleError::Transport(format!("no such article: {article_id}")))?;
        for (key, value) in payload {
            record.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn upload_file(&self, article_id: i64, path: &Path) -> Result<()> {
        self.uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((article_id, path.display().to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_create_then_fetch_round_trip() {
        let client = StaticClient::new();
        let mut payload = Map::new();
        payload.insert("title".into(), json!("Test Article"));

        let id = client.create_article(1, &payload).unwrap();
        let record = client.get_article(id).unwrap();
        assert_eq!(record["title"], json!("Test Article"));
        assert_eq!(record["id"], json!(id));
    }

    #[test]
    fn test_missing_article_is_transport_error() {
        let client = StaticClient::new();
        let err = client.get_article(99).unwrap_err();
        assert!(matches!(err, ArticleError::Transport(_)));
    }

    #[test]
    fn test_update_merges_payload() {
        let client = StaticClient::new();
        let mut payload = Map::new();
        payload.insert("title".into(), json!("Before"));
        let id = client.create_article(1, &payload).unwrap();

        let mut update = Map::new();
        update.insert("title".into(), json!("After"));
        update.insert("description".into(), json!("added"));
        client.update_article(id, &update).unwrap();

        let record = client.get_article(id).unwrap();
        assert_eq!(record["title"], json!("After"));
        assert_eq!(record["description"], json!("added"));
    }

    #[test]
    fn test_uploads_are_recorded() {
        let client = StaticClient::new();
        client.upload_file(7, Path::new("/data/scan.Z_flat")).unwrap();
        assert_eq!(client.uploads(), vec![(7, "/data/scan.Z_flat".to_string())]);
    }
}
