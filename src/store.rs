//! The session article collection.
//!
//! One store holds every article the session knows about, local files
//! waiting for upload and records fetched from the service alike, keyed by
//! article ID. The map sits behind an explicit lock so worker threads can
//! insert results while the owning thread reads; there is no other shared
//! mutable state in the crate.

use crate::{Article, ArticleError, Result};
use nanoid::nanoid;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// A locked map of all articles known to the session.
///
/// Local records get `local_<nanoid>` keys and are deduplicated by file
/// path; remote records are keyed by their numeric ID.
#[derive(Debug, Default)]
pub struct ArticleStore {
    inner: RwLock<HashMap<String, Article>>,
}

impl ArticleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a local article, minting and returning its session ID.
    ///
    /// A second article for the same file path is refused.
    pub fn insert_local(&self, mut article: Article) -> Result<String> {
        let mut articles = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(location) = article.desktop.location.as_deref() {
            let duplicate = articles
                .values()
                .any(|existing| existing.desktop.location.as_deref() == Some(location));
            if duplicate {
                return Err(ArticleError::Other(format!(
                    "article already exists for {location}"
                )));
            }
        }

        let local_id = format!("local_{}", nanoid!(10));
        article.figshare.id = Some(Value::String(local_id.clone()));
        debug!(%local_id, "inserted local article");
        articles.insert(local_id.clone(), article);
        Ok(local_id)
    }

    /// Inserts a fetched remote article, keyed by its numeric ID.
    pub fn insert_remote(&self, article: Article) -> Result<String> {
        let id = article.figshare.id_i64().ok_or_else(|| {
            ArticleError::InvalidFieldValue {
                field: "id".into(),
                message: "remote article without a numeric ID".into(),
            }
        })?;
        let key = id.to_string();
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), article);
        Ok(key)
    }

    /// A clone of the article, if present.
    pub fn get(&self, id: &str) -> Option<Article> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Runs `f` against the article under the read lock.
    pub fn with<R>(&self, id: &str, f: impl FnOnce(&Article) -> R) -> Result<R> {
        let articles = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let article = articles
            .get(id)
            .ok_or_else(|| ArticleError::UnknownArticle(id.to_string()))?;
        Ok(f(article))
    }

    /// Runs `f` against the article under the write lock.
    pub fn with_mut<R>(&self, id: &str, f: impl FnOnce(&mut Article) -> R) -> Result<R> {
        let mut articles = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let article = articles
            .get_mut(id)
            .ok_or_else(|| ArticleError::UnknownArticle(id.to_string()))?;
        Ok(f(article))
    }

    pub fn remove(&self, id: &str) -> Option<Article> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// All known article IDs, unordered.
    pub fn ids(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether some article already tracks this file path.
    pub fn contains_path(&self, path: impl AsRef<Path>) -> bool {
        let location = path.as_ref().display().to_string();
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|article| article.desktop.location.as_deref() == Some(location.as_str()))
    }
}
