//! Storage port and backends
//!
//! The registry commits every membership transition through this port before
//! mutating memory. `Ok(true)` means the write is durable and will survive a
//! restart; `Ok(false)` or an error means no durable record was made.
//!
//! Two implementations ship here: `FileStorage` (append-only transition log,
//! fsync per record) for production, and `MockStorage` as an explicit test
//! fixture with parameterized success, failure, and latency.

use crate::error::{StorageError, StorageResult};
use crate::membership::Membership;
use crate::node::NodeAddress;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Durable-write port consumed by the registry
///
/// Implementations must eventually resolve every call; the registry bounds
/// the await with its own commit timeout.
#[async_trait]
pub trait RegistryStorage: Send + Sync {
    /// Durably record that an address was added (initially active)
    async fn add(&self, addr: &NodeAddress) -> StorageResult<bool>;

    /// Durably record that an address was removed entirely
    async fn remove(&self, addr: &NodeAddress) -> StorageResult<bool>;

    /// Durably record that an address became active
    async fn activate(&self, addr: &NodeAddress) -> StorageResult<bool>;

    /// Durably record that an address became inactive
    async fn deactivate(&self, addr: &NodeAddress) -> StorageResult<bool>;
}

// =============================================================================
// Transition log records
// =============================================================================

/// Kind of membership transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TransitionOp {
    Add,
    Remove,
    Activate,
    Deactivate,
}

/// One record in the transition log
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransitionRecord {
    op: TransitionOp,
    hostname: String,
    port: u16,
}

impl TransitionRecord {
    fn new(op: TransitionOp, addr: &NodeAddress) -> Self {
        Self {
            op,
            hostname: addr.hostname().to_string(),
            port: addr.port(),
        }
    }

    fn address(&self) -> NodeAddress {
        NodeAddress::new_unchecked(self.hostname.clone(), self.port)
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// File-backed storage: append-only JSON-lines transition log
///
/// Each committed write is one line, flushed and fsynced before the call
/// returns. `recover` replays the log into the membership pair the registry
/// is reseeded with at startup.
pub struct FileStorage {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl FileStorage {
    /// Open (or create) the transition log at `path`
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the transition log
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay the transition log into `(active, inactive)` membership sets
    ///
    /// Replay applies the same state machine the registry does, so the
    /// recovered pair satisfies the partition invariant.
    ///
    /// An unparsable final record that the log's last append never finished
    /// (no trailing newline) is discarded with a warning: a crash or a
    /// dropped in-flight write leaves exactly that artifact, and the write
    /// was never acknowledged as committed. Corruption anywhere before the
    /// tail, or a newline-terminated garbage record, still fails hard.
    pub async fn recover(&self) -> StorageResult<(Membership, Membership)> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let terminated = contents.ends_with('\n');
        let lines: Vec<&str> = contents.lines().collect();

        let mut active = Membership::new();
        let mut inactive = Membership::new();

        for (index, line) in lines.iter().copied().enumerate() {
            if line.is_empty() {
                continue;
            }

            let record: TransitionRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(_) if index + 1 == lines.len() && !terminated => {
                    // Truncate the fragment so later appends don't fuse with it
                    let keep = (contents.len() - line.len()) as u64;
                    warn!(
                        record = index,
                        discarded_bytes = line.len(),
                        "truncating unfinished record at log tail"
                    );
                    let mut file = self.file.lock().await;
                    file.set_len(keep).await?;
                    file.sync_all().await?;
                    break;
                }
                Err(e) => {
                    return Err(StorageError::CorruptLog {
                        record: index,
                        reason: e.to_string(),
                    });
                }
            };
            let addr = record.address();

            match record.op {
                TransitionOp::Add => {
                    if !inactive.contains(&addr) {
                        active.insert(&addr);
                    }
                }
                TransitionOp::Remove => {
                    active.remove(&addr);
                    inactive.remove(&addr);
                }
                TransitionOp::Activate => {
                    inactive.remove(&addr);
                    active.insert(&addr);
                }
                TransitionOp::Deactivate => {
                    active.remove(&addr);
                    inactive.insert(&addr);
                }
            }
        }

        Ok((active, inactive))
    }

    async fn append(&self, op: TransitionOp, addr: &NodeAddress) -> StorageResult<bool> {
        let record = TransitionRecord::new(op, addr);
        let mut line = serde_json::to_vec(&record).map_err(|e| StorageError::Codec {
            reason: e.to_string(),
        })?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        // The record is committed only once it reaches the device.
        file.sync_all().await?;

        Ok(true)
    }
}

#[async_trait]
impl RegistryStorage for FileStorage {
    async fn add(&self, addr: &NodeAddress) -> StorageResult<bool> {
        self.append(TransitionOp::Add, addr).await
    }

    async fn remove(&self, addr: &NodeAddress) -> StorageResult<bool> {
        self.append(TransitionOp::Remove, addr).await
    }

    async fn activate(&self, addr: &NodeAddress) -> StorageResult<bool> {
        self.append(TransitionOp::Activate, addr).await
    }

    async fn deactivate(&self, addr: &NodeAddress) -> StorageResult<bool> {
        self.append(TransitionOp::Deactivate, addr).await
    }
}

// =============================================================================
// MockStorage (test fixture)
// =============================================================================

/// Outcome mode for `MockStorage`
#[derive(Debug)]
enum MockMode {
    /// Every write commits
    AlwaysCommit,
    /// Every write is declined
    AlwaysFail,
    /// Every write errors (transport failure)
    AlwaysError,
    /// Scripted outcomes in order; exhausted script declines
    Script(VecDeque<bool>),
}

/// In-memory storage double with parameterized outcomes
///
/// "Always commit" is an explicit fixture choice here, never a silent
/// production default. The served-write counter only counts calls that
/// actually reached the backend, which is what the commit-protocol tests
/// assert against.
pub struct MockStorage {
    mode: StdMutex<MockMode>,
    writes_served: AtomicU64,
    delay_ms: u64,
}

impl MockStorage {
    /// Fixture where every write commits
    pub fn always_commit() -> Self {
        Self::with_mode(MockMode::AlwaysCommit)
    }

    /// Fixture where every write is declined (`Ok(false)`)
    pub fn always_fail() -> Self {
        Self::with_mode(MockMode::AlwaysFail)
    }

    /// Fixture where every write errors out
    pub fn always_error() -> Self {
        Self::with_mode(MockMode::AlwaysError)
    }

    /// Fixture serving the given outcomes in order, declining once exhausted
    pub fn with_script(outcomes: impl IntoIterator<Item = bool>) -> Self {
        Self::with_mode(MockMode::Script(outcomes.into_iter().collect()))
    }

    /// Add fixed latency before each served write
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Number of writes this backend actually served
    pub fn writes_served(&self) -> u64 {
        self.writes_served.load(Ordering::SeqCst)
    }

    fn with_mode(mode: MockMode) -> Self {
        Self {
            mode: StdMutex::new(mode),
            writes_served: AtomicU64::new(0),
            delay_ms: 0,
        }
    }

    async fn serve(&self) -> StorageResult<bool> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }

        self.writes_served.fetch_add(1, Ordering::SeqCst);

        let mut mode = self.mode.lock().unwrap_or_else(|e| e.into_inner());
        match &mut *mode {
            MockMode::AlwaysCommit => Ok(true),
            MockMode::AlwaysFail => Ok(false),
            MockMode::AlwaysError => Err(StorageError::Codec {
                reason: "injected transport failure".into(),
            }),
            MockMode::Script(outcomes) => Ok(outcomes.pop_front().unwrap_or(false)),
        }
    }
}

#[async_trait]
impl RegistryStorage for MockStorage {
    async fn add(&self, _addr: &NodeAddress) -> StorageResult<bool> {
        self.serve().await
    }

    async fn remove(&self, _addr: &NodeAddress) -> StorageResult<bool> {
        self.serve().await
    }

    async fn activate(&self, _addr: &NodeAddress) -> StorageResult<bool> {
        self.serve().await
    }

    async fn deactivate(&self, _addr: &NodeAddress) -> StorageResult<bool> {
        self.serve().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(hostname: &str, port: u16) -> NodeAddress {
        NodeAddress::new(hostname, port).unwrap()
    }

    #[tokio::test]
    async fn test_mock_storage_modes() {
        let commit = MockStorage::always_commit();
        assert!(commit.add(&addr("h1", 5000)).await.unwrap());

        let fail = MockStorage::always_fail();
        assert!(!fail.add(&addr("h1", 5000)).await.unwrap());

        let error = MockStorage::always_error();
        assert!(error.add(&addr("h1", 5000)).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_storage_script_then_declines() {
        let storage = MockStorage::with_script([true, false]);

        assert!(storage.add(&addr("h1", 5000)).await.unwrap());
        assert!(!storage.add(&addr("h1", 5001)).await.unwrap());
        // Exhausted script declines
        assert!(!storage.add(&addr("h1", 5002)).await.unwrap());
        assert_eq!(storage.writes_served(), 3);
    }

    #[tokio::test]
    async fn test_file_storage_appends_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transitions.log");

        let storage = FileStorage::open(&path).await.unwrap();
        assert!(storage.add(&addr("h1", 5000)).await.unwrap());
        assert!(storage.add(&addr("h2", 5000)).await.unwrap());
        assert!(storage.deactivate(&addr("h1", 5000)).await.unwrap());
        assert!(storage.remove(&addr("h2", 5000)).await.unwrap());

        // Reopen and replay, as the server does at startup
        let reopened = FileStorage::open(&path).await.unwrap();
        let (active, inactive) = reopened.recover().await.unwrap();

        assert!(active.is_empty());
        assert_eq!(inactive.len(), 1);
        assert!(inactive.contains(&addr("h1", 5000)));
    }

    #[tokio::test]
    async fn test_file_storage_recover_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("empty.log")).await.unwrap();

        let (active, inactive) = storage.recover().await.unwrap();
        assert!(active.is_empty());
        assert!(inactive.is_empty());
    }

    #[tokio::test]
    async fn test_file_storage_recover_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.log");
        tokio::fs::write(&path, "not json\n").await.unwrap();

        let storage = FileStorage::open(&path).await.unwrap();
        let result = storage.recover().await;
        assert!(matches!(result, Err(StorageError::CorruptLog { .. })));
    }

    #[tokio::test]
    async fn test_file_storage_recover_discards_unfinished_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn.log");

        let storage = FileStorage::open(&path).await.unwrap();
        assert!(storage.add(&addr("h1", 5000)).await.unwrap());
        drop(storage);

        // A crash mid-append leaves a half-written record with no newline.
        // That write was never acknowledged, so replay must not lose the
        // committed records before it.
        let mut contents = tokio::fs::read(&path).await.unwrap();
        contents.extend_from_slice(b"{\"op\":\"add\",\"hostn");
        tokio::fs::write(&path, contents).await.unwrap();

        let reopened = FileStorage::open(&path).await.unwrap();
        let (active, inactive) = reopened.recover().await.unwrap();

        assert!(active.contains(&addr("h1", 5000)));
        assert_eq!(active.len(), 1);
        assert!(inactive.is_empty());
    }

    #[tokio::test]
    async fn test_file_storage_recover_rejects_corruption_before_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midcorrupt.log");

        // Corruption followed by a valid record is not a torn tail
        let valid = "{\"op\":\"add\",\"hostname\":\"h1\",\"port\":5000}\n";
        tokio::fs::write(&path, format!("not json\n{}", valid))
            .await
            .unwrap();

        let storage = FileStorage::open(&path).await.unwrap();
        let result = storage.recover().await;
        assert!(matches!(result, Err(StorageError::CorruptLog { .. })));
    }

    #[tokio::test]
    async fn test_file_storage_appends_after_torn_tail_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.log");

        // Only a torn fragment on disk: recovery yields empty membership
        tokio::fs::write(&path, "{\"op\":\"ad").await.unwrap();

        let storage = FileStorage::open(&path).await.unwrap();
        let (active, inactive) = storage.recover().await.unwrap();
        assert!(active.is_empty());
        assert!(inactive.is_empty());

        // Recovery truncates the fragment, so new records don't fuse with it
        assert!(storage.add(&addr("h2", 6000)).await.unwrap());
        let (active, _) = storage.recover().await.unwrap();
        assert!(active.contains(&addr("h2", 6000)));
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_file_storage_recover_activate_moves() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("moves.log")).await.unwrap();

        storage.add(&addr("h1", 5000)).await.unwrap();
        storage.deactivate(&addr("h1", 5000)).await.unwrap();
        storage.activate(&addr("h1", 5000)).await.unwrap();

        let (active, inactive) = storage.recover().await.unwrap();
        assert!(active.contains(&addr("h1", 5000)));
        assert!(inactive.is_empty());
    }
}
