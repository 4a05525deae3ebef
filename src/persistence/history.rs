//! Snapshot history on redb
//!
//! Tables:
//! - `snapshots`: id -> JSON snapshot, append-only
//! - `commits`: commit sha -> newest snapshot id for that commit
//! - `meta`: `next_id` counter and the `baseline` pointer
//! - `finding_lifecycle`: identity key -> JSON `FindingLifecycle`, upserted
//!   by every save; keys missing from the new snapshot turn resolved
//!
//! Ids are allocated inside the write transaction that stores the
//! snapshot. redb admits one writer at a time, so concurrent saves get
//! distinct, increasing ids and never touch earlier rows.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, Table, TableDefinition};
use tracing::{debug, info};

use super::models::{FindingLifecycle, FindingRecord, LifecycleStatus, Snapshot, SnapshotSummary};
use super::PersistenceError;

const SNAPSHOTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("snapshots");
const COMMITS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("commits");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");
const LIFECYCLE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("finding_lifecycle");

const NEXT_ID: &str = "next_id";
const BASELINE: &str = "baseline";

type Result<T> = std::result::Result<T, PersistenceError>;

fn store_err(e: impl Into<redb::Error>) -> PersistenceError {
    PersistenceError::Store(e.into().to_string())
}

pub struct HistoryStore {
    db: Database,
    path: PathBuf,
}

impl HistoryStore {
    /// Opens (or creates) the history file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PersistenceError::Store(e.to_string()))?;
        }
        let db = Database::create(path).map_err(store_err)?;

        // create tables up front so readers never see a missing table
        let txn = db.begin_write().map_err(store_err)?;
        txn.open_table(SNAPSHOTS_TABLE).map_err(store_err)?;
        txn.open_table(COMMITS_TABLE).map_err(store_err)?;
        txn.open_table(META_TABLE).map_err(store_err)?;
        txn.open_table(LIFECYCLE_TABLE).map_err(store_err)?;
        txn.commit().map_err(store_err)?;

        debug!("Opened snapshot history at {}", path.display());
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// `<repo>/.shannon/history.redb`
    pub fn default_path(repo: &Path) -> PathBuf {
        repo.join(".shannon").join("history.redb")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `snapshot`, updates finding lifecycles, and returns its id.
    pub fn save(&self, snapshot: &Snapshot) -> Result<u64> {
        let bytes = serde_json::to_vec(snapshot).map_err(|e| PersistenceError::Write(e.to_string()))?;

        let txn = self.db.begin_write().map_err(store_err)?;
        let id = {
            let mut meta = txn.open_table(META_TABLE).map_err(store_err)?;
            let id = meta.get(NEXT_ID).map_err(store_err)?.map_or(1, |g| g.value());
            meta.insert(NEXT_ID, id + 1).map_err(store_err)?;

            let mut snapshots = txn.open_table(SNAPSHOTS_TABLE).map_err(store_err)?;
            snapshots.insert(id, bytes.as_slice()).map_err(store_err)?;

            if let Some(sha) = &snapshot.commit_sha {
                let mut commits = txn.open_table(COMMITS_TABLE).map_err(store_err)?;
                commits.insert(sha.as_str(), id).map_err(store_err)?;
            }

            let mut lifecycle = txn.open_table(LIFECYCLE_TABLE).map_err(store_err)?;
            let resolved = update_lifecycle(&mut lifecycle, id, &snapshot.findings)?;
            debug!(id, resolved, "Updated finding lifecycle");
            id
        };
        txn.commit().map_err(|e| PersistenceError::Write(redb::Error::from(e).to_string()))?;

        info!(id, findings = snapshot.findings.len(), "Saved snapshot");
        Ok(id)
    }

    pub fn lifecycle(&self, identity_key: &str) -> Result<Option<FindingLifecycle>> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(LIFECYCLE_TABLE).map_err(store_err)?;
        let found = match table.get(identity_key).map_err(store_err)? {
            Some(guard) => Some(decode_lifecycle(identity_key, guard.value())?),
            None => None,
        };
        Ok(found)
    }

    /// Every lifecycle entry, by identity key.
    pub fn lifecycles(&self) -> Result<Vec<FindingLifecycle>> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(LIFECYCLE_TABLE).map_err(store_err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (key, value) = entry.map_err(store_err)?;
            out.push(decode_lifecycle(key.value(), value.value())?);
        }
        Ok(out)
    }

    /// Active findings seen in at least `min_persistence` snapshots, most
    /// persistent first, then by severity.
    pub fn chronic_findings(&self, min_persistence: u32, limit: usize) -> Result<Vec<FindingLifecycle>> {
        let mut chronic: Vec<FindingLifecycle> = self
            .lifecycles()?
            .into_iter()
            .filter(|l| l.is_active() && l.persistence_count >= min_persistence)
            .collect();
        chronic.sort_by(|a, b| {
            b.persistence_count
                .cmp(&a.persistence_count)
                .then(b.severity.total_cmp(&a.severity))
                .then_with(|| a.identity_key.cmp(&b.identity_key))
        });
        chronic.truncate(limit);
        Ok(chronic)
    }

    /// The newest `limit` snapshots with their ids, oldest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<(u64, Snapshot)>> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(SNAPSHOTS_TABLE).map_err(store_err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(store_err)?.rev().take(limit) {
            let (key, value) = entry.map_err(store_err)?;
            let id = key.value();
            out.push((id, decode(id, value.value())?));
        }
        out.reverse();
        Ok(out)
    }

    pub fn load(&self, id: u64) -> Result<Snapshot> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(SNAPSHOTS_TABLE).map_err(store_err)?;
        let guard = table.get(id).map_err(store_err)?.ok_or(PersistenceError::NotFound(id))?;
        decode(id, guard.value())
    }

    /// Most recent snapshot taken at `sha`, with its id.
    pub fn load_by_commit(&self, sha: &str) -> Result<Option<(u64, Snapshot)>> {
        let id = {
            let txn = self.db.begin_read().map_err(store_err)?;
            let commits = txn.open_table(COMMITS_TABLE).map_err(store_err)?;
            let found = commits.get(sha).map_err(store_err)?.map(|g| g.value());
            found
        };
        match id {
            Some(id) => Ok(Some((id, self.load(id)?))),
            None => Ok(None),
        }
    }

    /// Up to `limit` snapshots, newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<SnapshotSummary>> {
        let baseline = self.baseline_id()?;
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(SNAPSHOTS_TABLE).map_err(store_err)?;

        let mut out = Vec::new();
        for entry in table.iter().map_err(store_err)?.rev().take(limit) {
            let (key, value) = entry.map_err(store_err)?;
            let id = key.value();
            let snap = decode(id, value.value())?;
            out.push(SnapshotSummary {
                id,
                timestamp: snap.timestamp,
                commit_sha: snap.commit_sha,
                file_count: snap.file_count,
                finding_count: snap.findings.len(),
                is_baseline: baseline == Some(id),
            });
        }
        Ok(out)
    }

    /// Id of the newest snapshot.
    pub fn latest_id(&self) -> Result<Option<u64>> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(SNAPSHOTS_TABLE).map_err(store_err)?;
        let last = table.last().map_err(store_err)?.map(|(k, _)| k.value());
        Ok(last)
    }

    /// Points the baseline at `id`, which must exist.
    pub fn set_baseline(&self, id: u64) -> Result<()> {
        let txn = self.db.begin_write().map_err(store_err)?;
        {
            let snapshots = txn.open_table(SNAPSHOTS_TABLE).map_err(store_err)?;
            if snapshots.get(id).map_err(store_err)?.is_none() {
                return Err(PersistenceError::NotFound(id));
            }
            let mut meta = txn.open_table(META_TABLE).map_err(store_err)?;
            meta.insert(BASELINE, id).map_err(store_err)?;
        }
        txn.commit().map_err(store_err)?;
        info!(id, "Baseline set");
        Ok(())
    }

    pub fn baseline_id(&self) -> Result<Option<u64>> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let meta = txn.open_table(META_TABLE).map_err(store_err)?;
        let id = meta.get(BASELINE).map_err(store_err)?.map(|g| g.value());
        Ok(id)
    }

    /// Returns whether a baseline was set.
    pub fn clear_baseline(&self) -> Result<bool> {
        let txn = self.db.begin_write().map_err(store_err)?;
        let removed = {
            let mut meta = txn.open_table(META_TABLE).map_err(store_err)?;
            let removed = meta.remove(BASELINE).map_err(store_err)?.is_some();
            removed
        };
        txn.commit().map_err(store_err)?;
        Ok(removed)
    }

    pub fn load_baseline(&self) -> Result<Option<(u64, Snapshot)>> {
        match self.baseline_id()? {
            Some(id) => Ok(Some((id, self.load(id)?))),
            None => Ok(None),
        }
    }
}

/// Upserts every finding of snapshot `id` as active and resolves active
/// entries it no longer contains. Returns how many were resolved.
fn update_lifecycle(
    table: &mut Table<&'static str, &'static [u8]>,
    id: u64,
    findings: &[FindingRecord],
) -> Result<usize> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for record in findings {
        let key = record.identity_key.as_str();
        if !seen.insert(key) {
            continue;
        }
        let existing = match table.get(key).map_err(store_err)? {
            Some(guard) => Some(decode_lifecycle(key, guard.value())?),
            None => None,
        };
        let entry = match existing {
            Some(mut entry) => {
                entry.observe(id, record);
                entry
            }
            None => FindingLifecycle::first_seen(id, record),
        };
        put_lifecycle(table, &entry)?;
    }

    let mut resolved = Vec::new();
    for entry in table.iter().map_err(store_err)? {
        let (key, value) = entry.map_err(store_err)?;
        if seen.contains(key.value()) {
            continue;
        }
        let mut lifecycle = decode_lifecycle(key.value(), value.value())?;
        if lifecycle.is_active() {
            lifecycle.current_status = LifecycleStatus::Resolved;
            resolved.push(lifecycle);
        }
    }
    for lifecycle in &resolved {
        put_lifecycle(table, lifecycle)?;
    }
    Ok(resolved.len())
}

fn put_lifecycle(table: &mut Table<&'static str, &'static [u8]>, lifecycle: &FindingLifecycle) -> Result<()> {
    let bytes = serde_json::to_vec(lifecycle).map_err(|e| PersistenceError::Write(e.to_string()))?;
    table
        .insert(lifecycle.identity_key.as_str(), bytes.as_slice())
        .map_err(store_err)?;
    Ok(())
}

fn decode_lifecycle(key: &str, bytes: &[u8]) -> Result<FindingLifecycle> {
    serde_json::from_slice(bytes).map_err(|e| PersistenceError::Store(format!("lifecycle entry {key} is corrupt: {e}")))
}

fn decode(id: u64, bytes: &[u8]) -> Result<Snapshot> {
    serde_json::from_slice(bytes).map_err(|e| PersistenceError::Corrupt {
        id,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Finding;
    use crate::persistence::identity::compute_identity_key;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn open() -> (TempDir, HistoryStore) {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::open(&dir.path().join(".shannon").join("history.redb")).unwrap();
        (dir, store)
    }

    fn snap(sha: Option<&str>, files: usize) -> Snapshot {
        let mut s = Snapshot::new("/repo");
        s.commit_sha = sha.map(String::from);
        s.file_count = files;
        s
    }

    #[test]
    fn test_save_and_load() {
        let (_dir, store) = open();
        let a = store.save(&snap(Some("abc"), 3)).unwrap();
        let b = store.save(&snap(None, 4)).unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(store.load(a).unwrap().file_count, 3);
        assert!(matches!(store.load(99), Err(PersistenceError::NotFound(99))));
        assert_eq!(store.latest_id().unwrap(), Some(2));
    }

    #[test]
    fn test_load_by_commit_prefers_newest() {
        let (_dir, store) = open();
        store.save(&snap(Some("abc"), 1)).unwrap();
        let newer = store.save(&snap(Some("abc"), 2)).unwrap();
        let (id, found) = store.load_by_commit("abc").unwrap().unwrap();
        assert_eq!(id, newer);
        assert_eq!(found.file_count, 2);
        assert!(store.load_by_commit("nope").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let (_dir, store) = open();
        for n in 0..5 {
            store.save(&snap(None, n)).unwrap();
        }
        store.set_baseline(4).unwrap();
        let rows = store.list(3).unwrap();
        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
        assert!(rows[1].is_baseline);
    }

    #[test]
    fn test_baseline_pointer() {
        let (_dir, store) = open();
        assert!(store.load_baseline().unwrap().is_none());
        assert!(matches!(store.set_baseline(1), Err(PersistenceError::NotFound(1))));

        let id = store.save(&snap(None, 7)).unwrap();
        store.set_baseline(id).unwrap();
        assert_eq!(store.baseline_id().unwrap(), Some(id));
        assert_eq!(store.load_baseline().unwrap().unwrap().1.file_count, 7);

        assert!(store.clear_baseline().unwrap());
        assert!(!store.clear_baseline().unwrap());
        assert_eq!(store.baseline_id().unwrap(), None);
    }

    fn with_findings(paths: &[&str]) -> Snapshot {
        let mut s = snap(None, paths.len());
        s.findings = paths
            .iter()
            .map(|p| FindingRecord::from(&Finding::new("god_file", 0.6, format!("God file: {p}")).with_files(vec![p.to_string()])))
            .collect();
        s
    }

    fn key(path: &str) -> String {
        compute_identity_key("god_file", &[path.to_string()])
    }

    #[test]
    fn test_lifecycle_tracks_appearances() {
        let (_dir, store) = open();
        store.save(&with_findings(&["a.py", "b.py"])).unwrap();
        store.save(&with_findings(&["a.py", "a.py"])).unwrap();
        let third = store.save(&with_findings(&["a.py"])).unwrap();

        let a = store.lifecycle(&key("a.py")).unwrap().unwrap();
        assert_eq!((a.first_seen_snapshot, a.last_seen_snapshot), (1, third));
        assert_eq!(a.persistence_count, 3);
        assert!(a.is_active());

        let b = store.lifecycle(&key("b.py")).unwrap().unwrap();
        assert_eq!(b.current_status, LifecycleStatus::Resolved);
        assert_eq!((b.last_seen_snapshot, b.persistence_count), (1, 1));
        assert!(store.lifecycle("missing").unwrap().is_none());
    }

    #[test]
    fn test_empty_snapshot_resolves_everything() {
        let (_dir, store) = open();
        store.save(&with_findings(&["a.py"])).unwrap();
        store.save(&with_findings(&[])).unwrap();
        assert!(store.lifecycles().unwrap().iter().all(|l| !l.is_active()));

        store.save(&with_findings(&["a.py"])).unwrap();
        let a = store.lifecycle(&key("a.py")).unwrap().unwrap();
        assert!(a.is_active());
        assert_eq!((a.first_seen_snapshot, a.persistence_count), (1, 2));
    }

    #[test]
    fn test_chronic_findings() {
        let (_dir, store) = open();
        store.save(&with_findings(&["a.py", "c.py"])).unwrap();
        store.save(&with_findings(&["a.py", "b.py", "c.py"])).unwrap();
        store.save(&with_findings(&["a.py", "b.py"])).unwrap();

        let chronic = store.chronic_findings(2, 10).unwrap();
        let files: Vec<&str> = chronic.iter().map(|l| l.files[0].as_str()).collect();
        // c.py was seen twice but is resolved now
        assert_eq!(files, vec!["a.py", "b.py"]);
        assert_eq!(store.chronic_findings(3, 10).unwrap().len(), 1);
        assert_eq!(store.chronic_findings(1, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_keeps_counter() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("h.redb");
        {
            let store = HistoryStore::open(&path).unwrap();
            store.save(&snap(None, 1)).unwrap();
        }
        let store = HistoryStore::open(&path).unwrap();
        assert_eq!(store.save(&snap(None, 2)).unwrap(), 2);
    }

    #[test]
    fn test_concurrent_saves_get_distinct_ids() {
        let (_dir, store) = open();
        let store = Arc::new(store);
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let s = Arc::clone(&store);
                thread::spawn(move || (0..5).map(|i| s.save(&snap(None, t * 10 + i)).unwrap()).collect::<Vec<_>>())
            })
            .collect();
        let mut ids: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
        assert_eq!(store.list(100).unwrap().len(), 20);
    }
}
