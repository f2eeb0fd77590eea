//! Bulk worker threads.
//!
//! Loading a project's article list, scanning a directory of files, and
//! draining the upload queue all block on the network or the disk, so each
//! runs on its own thread. A worker owns its input collection outright,
//! pops one item at a time, and reports progress over a channel; results
//! reach the rest of the session only through the [`ArticleStore`] lock.
//! Once started a worker runs to completion; there is no cancellation.

use crate::client::FigshareClient;
use crate::normalize::Normalizer;
use crate::store::ArticleStore;
use crate::{Article, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Per-item progress reported by a worker.
///
/// Every worker emits exactly one [`WorkerEvent::Done`] after its last
/// item, whatever happened before.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// A remote article was fetched and stored.
    Loaded(String),
    /// A local article was created and stored.
    Created(String),
    /// A local article was created on the service and its file attached.
    Uploaded { local_id: String, article_id: i64 },
    /// One item failed; the worker moves on to the next.
    Failed { id: String, message: String },
    /// The worker drained its input set.
    Done,
}

/// Fetches a batch of remote articles into the store.
pub fn spawn_loader<C>(
    client: Arc<C>,
    store: Arc<ArticleStore>,
    article_ids: Vec<i64>,
    tx: Sender<WorkerEvent>,
) -> JoinHandle<()>
where
    C: FigshareClient + Send + Sync + 'static,
{
    std::thread::spawn(move || {
        for article_id in article_ids {
            match load_one(&*client, &store, article_id) {
                Ok(key) => {
                    debug!(%key, "loaded remote article");
                    tx.send(WorkerEvent::Loaded(key)).ok();
                }
                Err(err) => {
                    warn!(article_id, %err, "failed to load remote article");
                    tx.send(WorkerEvent::Failed {
                        id: article_id.to_string(),
                        message: err.to_string(),
                    })
                    .ok();
                }
            }
        }
        tx.send(WorkerEvent::Done).ok();
    })
}

fn load_one<C: FigshareClient>(
    client: &C,
    store: &ArticleStore,
    article_id: i64,
) -> Result<String> {
    let raw = client.get_article(article_id)?;
    let mut article = Article::from_remote(&raw);
    article.check_uptodate(client)?;
    store.insert_remote(article)
}

/// Creates a local article per file path.
///
/// Paths the store already tracks are reported as failures and left alone.
pub fn spawn_scanner(
    store: Arc<ArticleStore>,
    paths: Vec<PathBuf>,
    tx: Sender<WorkerEvent>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for path in paths {
            if store.contains_path(&path) {
                tx.send(WorkerEvent::Failed {
                    id: path.display().to_string(),
                    message: "file is already tracked".into(),
                })
                .ok();
                continue;
            }
            match store.insert_local(Article::local(&path)) {
                Ok(local_id) => {
                    debug!(%local_id, path = %path.display(), "created local article");
                    tx.send(WorkerEvent::Created(local_id)).ok();
                }
                Err(err) => {
                    tx.send(WorkerEvent::Failed {
                        id: path.display().to_string(),
                        message: err.to_string(),
                    })
                    .ok();
                }
            }
        }
        tx.send(WorkerEvent::Done).ok();
    })
}

/// Uploads a queue of local articles into a project.
///
/// Each article is created from its upload payload, then its file is
/// attached. Per-item errors are reported and the drain continues.
pub fn spawn_uploader<C>(
    client: Arc<C>,
    store: Arc<ArticleStore>,
    project_id: i64,
    queue: Vec<String>,
    tx: Sender<WorkerEvent>,
) -> JoinHandle<()>
where
    C: FigshareClient + Send + Sync + 'static,
{
    std::thread::spawn(move || {
        for local_id in queue {
            match upload_one(&*client, &store, project_id, &local_id) {
                Ok(article_id) => {
                    debug!(%local_id, article_id, "uploaded article");
                    tx.send(WorkerEvent::Uploaded {
                        local_id,
                        article_id,
                    })
                    .ok();
                }
                Err(err) => {
                    warn!(%local_id, %err, "upload failed");
                    tx.send(WorkerEvent::Failed {
                        id: local_id,
                        message: err.to_string(),
                    })
                    .ok();
                }
            }
        }
        tx.send(WorkerEvent::Done).ok();
    })
}

fn upload_one<C: FigshareClient>(
    client: &C,
    store: &ArticleStore,
    project_id: i64,
    local_id: &str,
) -> Result<i64> {
    let normalizer = Normalizer::new(client);
    let payload = store.with_mut(local_id, |article| article.upload_dict(&normalizer))??;
    let location = store.with(local_id, |article| article.desktop.location.clone())?;

    let article_id = client.create_article(project_id, &payload)?;
    if let Some(location) = location {
        client.upload_file(article_id, location.as_ref())?;
    }
    Ok(article_id)
}
