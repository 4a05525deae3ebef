use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{ErrorCode, ShannonError, ShannonResult};

/// Every tunable of an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    // ==================== Graph ====================
    pub pagerank_damping: f64,
    pub pagerank_iterations: usize,
    pub pagerank_tolerance: f64,
    /// Spectral analysis is skipped above this many files.
    pub spectral_max_nodes: usize,
    /// NCD below this marks a clone pair.
    pub clone_threshold: f64,

    // ==================== Normalization ====================
    /// Fewer files than this → ABSOLUTE tier.
    pub absolute_tier_max_files: usize,
    /// At least this many files → FULL tier.
    pub full_tier_min_files: usize,
    /// Pseudo-count of the uniform prior used by BAYESIAN percentiles.
    pub bayesian_prior_strength: f64,

    // ==================== Temporal ====================
    pub churn_window_weeks: u32,
    pub cochange_min_count: usize,
    /// Commits touching more files than this are treated as bulk changes.
    pub cochange_max_files_per_commit: usize,
    /// 0 = no limit
    pub git_max_commits: usize,
    /// Below this temporal analysis is skipped.
    pub git_min_commits: usize,
    pub git_timeout_secs: u64,

    // ==================== Insights ====================
    pub insights_max_findings: usize,
    pub enable_validation: bool,

    // ==================== History ====================
    pub enable_history: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            pagerank_damping: 0.85,
            pagerank_iterations: 100,
            pagerank_tolerance: 1e-6,
            spectral_max_nodes: 2000,
            clone_threshold: 0.30,
            absolute_tier_max_files: 15,
            full_tier_min_files: 50,
            bayesian_prior_strength: 2.0,
            churn_window_weeks: 4,
            cochange_min_count: 2,
            cochange_max_files_per_commit: 50,
            git_max_commits: 5000,
            git_min_commits: 10,
            git_timeout_secs: 30,
            insights_max_findings: 50,
            enable_validation: true,
            enable_history: true,
        }
    }
}

impl AnalysisSettings {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).context("Invalid configuration TOML")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values outside their meaningful ranges.
    pub fn validate(&self) -> ShannonResult<()> {
        let invalid = |field: &str, value: String| {
            Err(ShannonError::fatal(ErrorCode::SC603, format!("invalid setting {field} = {value}"))
                .with_context("field", field))
        };
        if !(0.0..=1.0).contains(&self.pagerank_damping) {
            return invalid("pagerank_damping", self.pagerank_damping.to_string());
        }
        if self.pagerank_tolerance <= 0.0 {
            return invalid("pagerank_tolerance", self.pagerank_tolerance.to_string());
        }
        if !(0.0..=1.0).contains(&self.clone_threshold) {
            return invalid("clone_threshold", self.clone_threshold.to_string());
        }
        if self.absolute_tier_max_files > self.full_tier_min_files {
            return invalid("absolute_tier_max_files", self.absolute_tier_max_files.to_string());
        }
        if self.bayesian_prior_strength < 0.0 {
            return invalid("bayesian_prior_strength", self.bayesian_prior_strength.to_string());
        }
        if self.churn_window_weeks == 0 {
            return invalid("churn_window_weeks", "0".to_string());
        }
        if self.insights_max_findings == 0 {
            return invalid("insights_max_findings", "0".to_string());
        }
        Ok(())
    }

    /// Short SHA-256 of the canonical TOML rendering.
    ///
    /// Stored in snapshots so diffs can tell when settings changed between runs.
    pub fn config_hash(&self) -> String {
        let rendered = toml::to_string(self).unwrap_or_default();
        let digest = Sha256::digest(rendered.as_bytes());
        digest.iter().take(8).map(|b| format!("{b:02x}")).collect()
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_parse::<usize>("SHANNON_MAX_FINDINGS") {
            self.insights_max_findings = v;
        }
        if let Some(v) = env_parse::<usize>("SHANNON_GIT_MAX_COMMITS") {
            self.git_max_commits = v;
        }
        if let Some(v) = env_parse::<u64>("SHANNON_GIT_TIMEOUT_SECS") {
            self.git_timeout_secs = v;
        }
        if let Some(v) = env_parse::<bool>("SHANNON_ENABLE_VALIDATION") {
            self.enable_validation = v;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring unparsable {}={}", key, raw);
            None
        }
    }
}

/// `~/.config/shannon-insight/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("shannon-insight").join("config.toml"))
}

/// `<repo>/.shannon/config.toml`
pub fn project_config_path(repo_path: &Path) -> PathBuf {
    repo_path.join(".shannon").join("config.toml")
}

/// Recursively overlays `top` onto `base`; tables merge, scalars replace.
fn merge_toml(base: &mut toml::Value, top: toml::Value) {
    match (base, top) {
        (toml::Value::Table(base_table), toml::Value::Table(top_table)) => {
            for (key, value) in top_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, top) => *base = top,
    }
}

fn read_layer(path: &Path) -> Result<Option<toml::Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let value: toml::Value =
        toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))?;
    debug!("Loaded config layer from {}", path.display());
    Ok(Some(value))
}

/// Loads the layered settings for the repository at `repo_path`.
pub fn load_settings(repo_path: &Path) -> Result<AnalysisSettings> {
    let mut merged = toml::Value::Table(toml::map::Map::new());

    let layers = user_config_path()
        .into_iter()
        .chain(std::iter::once(project_config_path(repo_path)));
    for path in layers {
        if let Some(layer) = read_layer(&path)? {
            merge_toml(&mut merged, layer);
        }
    }

    let mut settings: AnalysisSettings = merged.try_into().context("Invalid configuration values")?;
    settings.apply_env();
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = AnalysisSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.absolute_tier_max_files, 15);
        assert_eq!(settings.full_tier_min_files, 50);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = AnalysisSettings::from_toml_str("clone_threshold = 0.25\n").unwrap();
        assert_eq!(settings.clone_threshold, 0.25);
        assert_eq!(settings.pagerank_damping, 0.85);
    }

    #[test]
    fn test_invalid_damping_rejected() {
        assert!(AnalysisSettings::from_toml_str("pagerank_damping = 1.5\n").is_err());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(AnalysisSettings::from_toml_str("this is = = not toml").is_err());
    }

    #[test]
    fn test_config_hash_changes_with_settings() {
        let a = AnalysisSettings::default();
        let mut b = AnalysisSettings::default();
        assert_eq!(a.config_hash(), b.config_hash());
        b.bayesian_prior_strength = 4.0;
        assert_ne!(a.config_hash(), b.config_hash());
        assert_eq!(a.config_hash().len(), 16);
    }

    #[test]
    fn test_project_layer_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let shannon_dir = dir.path().join(".shannon");
        std::fs::create_dir_all(&shannon_dir).unwrap();
        std::fs::write(shannon_dir.join("config.toml"), "insights_max_findings = 7\n").unwrap();

        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.insights_max_findings, 7);
    }

    #[test]
    fn test_merge_tables() {
        let mut base: toml::Value = toml::from_str("a = 1\nb = 2\n").unwrap();
        let top: toml::Value = toml::from_str("b = 3\nc = 4\n").unwrap();
        merge_toml(&mut base, top);
        assert_eq!(base["a"].as_integer(), Some(1));
        assert_eq!(base["b"].as_integer(), Some(3));
        assert_eq!(base["c"].as_integer(), Some(4));
    }
}
