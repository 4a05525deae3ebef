//! Snapshot history, diff, baseline and trend commands

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::json;

use shannon_insight::persistence::diff::DEFAULT_METRIC_THRESHOLD;
use shannon_insight::persistence::{diff_snapshots, HistoryStore};

use super::{print_json, BaselineAction, TrendQuery};

fn open(repo: &Path) -> Result<HistoryStore> {
    let path = HistoryStore::default_path(repo);
    HistoryStore::open(&path).with_context(|| format!("Failed to open snapshot history at {}", path.display()))
}

pub(super) fn list(repo: &Path, limit: usize) -> Result<()> {
    let history = open(repo)?;
    print_json(&history.list(limit)?)
}

pub(super) fn diff(repo: &Path, from: Option<u64>, to: Option<u64>, renames: Vec<(String, String)>) -> Result<()> {
    let history = open(repo)?;

    let Some(to) = to.map_or_else(|| history.latest_id(), |id| Ok(Some(id)))? else {
        bail!("No snapshots stored yet; run `analyze --save` first");
    };
    let from = match from {
        Some(id) => id,
        None => match history.baseline_id()? {
            Some(id) => id,
            None if to > 1 => to - 1,
            None => bail!("Need two snapshots (or a baseline) to diff"),
        },
    };

    let old = history.load(from)?;
    let new = history.load(to)?;
    let renames: BTreeMap<String, String> = renames.into_iter().collect();
    print_json(&diff_snapshots(&old, &new, &renames, DEFAULT_METRIC_THRESHOLD))
}

pub(super) fn baseline(repo: &Path, action: BaselineAction) -> Result<()> {
    let history = open(repo)?;
    match action {
        BaselineAction::Set { id } => {
            history.set_baseline(id)?;
            print_json(&json!({ "baseline": id }))
        }
        BaselineAction::Clear => {
            let cleared = history.clear_baseline()?;
            print_json(&json!({ "cleared": cleared }))
        }
        BaselineAction::Show => match history.load_baseline()? {
            Some((id, snapshot)) => print_json(&json!({ "baseline": id, "snapshot": snapshot })),
            None => print_json(&json!({ "baseline": null })),
        },
    }
}

pub(super) fn trend(repo: &Path, query: TrendQuery) -> Result<()> {
    let history = open(repo)?;
    match query {
        TrendQuery::File { path, metric, last } => print_json(&history.file_trend(&path, &metric, last)?),
        TrendQuery::Health { last } => print_json(&history.codebase_health(last)?),
        TrendQuery::Movers { metric, last } => print_json(&history.top_movers(&metric, last)?),
        TrendQuery::Chronic { min, limit } => print_json(&history.chronic_findings(min, limit)?),
        TrendQuery::Persistent { min } => print_json(&history.persistent_findings(min)?),
    }
}
