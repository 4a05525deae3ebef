//! Progress events shared between the pipeline and any observers

pub mod progress;

pub use progress::{ListenerId, ProgressBroadcaster, ProgressState};
