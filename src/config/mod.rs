//! Configuration for the analysis engine
//!
//! Settings are layered, lowest priority first:
//! - built-in defaults
//! - user config (`~/.config/shannon-insight/config.toml`)
//! - project config (`<repo>/.shannon/config.toml`)
//! - `SHANNON_*` environment variables
//!
//! Unknown keys are ignored so older binaries can read newer files.

mod settings;

pub use settings::{load_settings, project_config_path, user_config_path, AnalysisSettings};
