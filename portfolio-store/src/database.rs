//! Single-file JSON document store.
//!
//! The backing file is the sole source of truth. Reads parse it on
//! demand; mutations are sent to one owning writer task, so at most one
//! mutator runs at a time and callers are served in submission order.
//! Every successful mutation is persisted by writing a temporary sibling
//! file and atomically renaming it over the target, so readers never
//! observe a partially written file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{mpsc, oneshot};

use crate::error::{StoreError, StoreResult};
use crate::models::{Contact, Project, User};

/// The three-collection container persisted to disk. The file always
/// holds exactly these keys; a missing or malformed collection reads as
/// empty rather than failing, to tolerate partial manual edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseContents {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub users: Vec<User>,
}

type ApplyFn = Box<dyn FnOnce(&mut DatabaseContents) -> StoreResult<()> + Send>;

struct WriteJob {
    apply: ApplyFn,
    done: oneshot::Sender<StoreResult<()>>,
}

/// Handle to the document store. Cheap to clone; every clone shares the
/// same writer task and therefore the same mutation queue. One instance
/// per process owns the file — there is no cross-process locking.
#[derive(Clone)]
pub struct FileDatabase {
    path: PathBuf,
    writer: mpsc::UnboundedSender<WriteJob>,
}

impl FileDatabase {
    /// Open a store over `path` and spawn its writer task. Must be called
    /// from within a tokio runtime.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let (writer, jobs) = mpsc::unbounded_channel();
        tokio::spawn(writer_loop(path.clone(), jobs));
        Self { path, writer }
    }

    /// Create the parent directory and an empty three-collection file if
    /// the backing file does not exist yet. Idempotent.
    pub async fn ensure(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        if fs::try_exists(&self.path).await? {
            return Ok(());
        }
        write_atomic(&self.path, &DatabaseContents::default()).await
    }

    /// Parse the current file. Side-effect-free; concurrent reads never
    /// queue behind pending mutations.
    pub async fn read(&self) -> StoreResult<DatabaseContents> {
        read_contents(&self.path).await
    }

    /// Queue `mutate` behind any in-flight mutations. The mutator runs
    /// against a freshly parsed copy of the file, so nothing it does is
    /// visible to other readers until the commit lands. A mutator error
    /// aborts the job without touching the file. The job executes and
    /// commits even if the returned future is dropped before completion.
    pub async fn update<T, F>(&self, mutate: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut DatabaseContents) -> StoreResult<T> + Send + 'static,
    {
        let (value_tx, value_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let job = WriteJob {
            apply: Box::new(move |contents| {
                let value = mutate(contents)?;
                let _ = value_tx.send(value);
                Ok(())
            }),
            done: done_tx,
        };

        self.writer.send(job).map_err(|_| StoreError::WriterGone)?;
        done_rx.await.map_err(|_| StoreError::WriterGone)??;
        value_rx.await.map_err(|_| StoreError::WriterGone)
    }
}

async fn writer_loop(path: PathBuf, mut jobs: mpsc::UnboundedReceiver<WriteJob>) {
    while let Some(job) = jobs.recv().await {
        let outcome = commit(&path, job.apply).await;
        // The caller may have stopped waiting; the commit already happened.
        let _ = job.done.send(outcome);
    }
}

async fn commit(path: &Path, apply: ApplyFn) -> StoreResult<()> {
    let mut contents = read_contents(path).await?;
    apply(&mut contents)?;
    write_atomic(path, &contents).await
}

async fn read_contents(path: &Path) -> StoreResult<DatabaseContents> {
    let raw = fs::read_to_string(path).await?;
    if raw.trim().is_empty() {
        return Ok(DatabaseContents::default());
    }
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    Ok(DatabaseContents {
        projects: coerce_collection(&value, "projects"),
        contacts: coerce_collection(&value, "contacts"),
        users: coerce_collection(&value, "users"),
    })
}

/// A collection that is absent or does not deserialize as a sequence of
/// its record type reads as empty. Only invalid JSON is an error.
fn coerce_collection<T>(value: &serde_json::Value, key: &str) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
{
    value
        .get(key)
        .cloned()
        .and_then(|collection| serde_json::from_value(collection).ok())
        .unwrap_or_default()
}

async fn write_atomic(path: &Path, contents: &DatabaseContents) -> StoreResult<()> {
    let mut pretty = serde_json::to_vec_pretty(contents)?;
    pretty.push(b'\n');
    let temp = temp_path(path);
    fs::write(&temp, &pretty).await?;
    fs::rename(&temp, path).await?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
