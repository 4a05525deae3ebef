//! Trend queries over saved snapshots
//!
//! All queries read the newest `last_n` snapshots and return points in
//! chronological order. Metrics are the signal names stored in the
//! snapshot maps.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use super::history::HistoryStore;
use super::models::{HealthPoint, Mover, PersistentFinding, Snapshot, TrendPoint};
use super::PersistenceError;

const MAX_MOVERS: usize = 10;

impl HistoryStore {
    /// `metric` for `path` in each recent snapshot that has it.
    pub fn file_trend(&self, path: &str, metric: &str, last_n: usize) -> Result<Vec<TrendPoint>, PersistenceError> {
        Ok(self
            .recent(last_n)?
            .into_iter()
            .filter_map(|(id, snap)| {
                let value = *snap.file_signals.get(path)?.get(metric)?;
                Some(TrendPoint {
                    snapshot_id: id,
                    commit_sha: snap.commit_sha,
                    timestamp: snap.timestamp,
                    value,
                })
            })
            .collect())
    }

    /// Global signals per snapshot, with the finding count as
    /// `active_findings`.
    pub fn codebase_health(&self, last_n: usize) -> Result<Vec<HealthPoint>, PersistenceError> {
        Ok(self
            .recent(last_n)?
            .into_iter()
            .map(|(id, snap)| {
                let mut metrics = snap.global_signals.clone();
                metrics.insert("active_findings".to_string(), snap.findings.len() as f64);
                HealthPoint {
                    snapshot_id: id,
                    timestamp: snap.timestamp,
                    metrics,
                }
            })
            .collect())
    }

    /// Files whose `metric` changed most between the oldest and newest of
    /// the last `last_n` snapshots. Files missing from either end are skipped.
    pub fn top_movers(&self, metric: &str, last_n: usize) -> Result<Vec<Mover>, PersistenceError> {
        let recent = self.recent(last_n)?;
        match recent.as_slice() {
            [(_, oldest), .., (_, newest)] => Ok(movers(oldest, newest, metric)),
            _ => Ok(Vec::new()),
        }
    }

    /// Findings present in at least `min_snapshots` consecutive snapshots,
    /// longest streak first.
    pub fn persistent_findings(&self, min_snapshots: usize) -> Result<Vec<PersistentFinding>, PersistenceError> {
        let snapshots: Vec<Snapshot> = self.recent(usize::MAX)?.into_iter().map(|(_, s)| s).collect();
        Ok(streaks(&snapshots, min_snapshots))
    }
}

fn metric_values<'a>(snap: &'a Snapshot, metric: &str) -> BTreeMap<&'a str, f64> {
    snap.file_signals
        .iter()
        .filter_map(|(path, signals)| Some((path.as_str(), *signals.get(metric)?)))
        .collect()
}

fn movers(oldest: &Snapshot, newest: &Snapshot, metric: &str) -> Vec<Mover> {
    let before = metric_values(oldest, metric);
    let mut out: Vec<Mover> = metric_values(newest, metric)
        .into_iter()
        .filter_map(|(path, new_value)| {
            let old_value = *before.get(path)?;
            Some(Mover {
                path: path.to_string(),
                old_value,
                new_value,
                delta: new_value - old_value,
            })
        })
        .filter(|m| m.delta != 0.0)
        .collect();
    out.sort_by(|a, b| b.delta.abs().total_cmp(&a.delta.abs()).then_with(|| a.path.cmp(&b.path)));
    out.truncate(MAX_MOVERS);
    out
}

struct Run {
    current: usize,
    best: usize,
    last_index: usize,
    latest: PersistentFinding,
}

/// Longest run per identity key over `snapshots` (chronological); details
/// come from the finding's latest appearance.
fn streaks(snapshots: &[Snapshot], min_snapshots: usize) -> Vec<PersistentFinding> {
    let mut runs: BTreeMap<&str, Run> = BTreeMap::new();
    for (i, snap) in snapshots.iter().enumerate() {
        for record in &snap.findings {
            let latest = PersistentFinding {
                identity_key: record.identity_key.clone(),
                finding_type: record.finding.finding_type.clone(),
                title: record.finding.title.clone(),
                files: record.finding.files.clone(),
                severity: record.finding.severity,
                streak: 0,
            };
            let run = match runs.entry(record.identity_key.as_str()) {
                Entry::Vacant(slot) => {
                    slot.insert(Run {
                        current: 1,
                        best: 1,
                        last_index: i,
                        latest,
                    });
                    continue;
                }
                Entry::Occupied(slot) => slot.into_mut(),
            };
            // listed twice in one snapshot
            if run.last_index == i {
                continue;
            }
            run.current = if run.last_index + 1 == i { run.current + 1 } else { 1 };
            run.best = run.best.max(run.current);
            run.last_index = i;
            run.latest = latest;
        }
    }

    let mut out: Vec<PersistentFinding> = runs
        .into_values()
        .filter(|run| run.best >= min_snapshots)
        .map(|run| PersistentFinding {
            streak: run.best,
            ..run.latest
        })
        .collect();
    out.sort_by(|a, b| b.streak.cmp(&a.streak).then_with(|| a.identity_key.cmp(&b.identity_key)));
    out
}
