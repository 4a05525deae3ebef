// Analyzer ordering
//
// Two waves: regular analyzers, then `run_last` analyzers. Each wave is
// topologically sorted on provides -> requires edges (Kahn), ties broken by
// registration order. A slot provided twice or a dependency cycle is a
// configuration error raised before anything runs.

use std::collections::BTreeMap;

use thiserror::Error;

use super::base::Analyzer;
use crate::error::{ErrorCode, ShannonError};
use crate::store::SlotKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestrationError {
    #[error("slot '{slot}' provided by both {first} and {second}")]
    SlotCollision {
        slot: SlotKind,
        first: &'static str,
        second: &'static str,
    },

    #[error("analyzer dependency cycle among: {}", .0.join(", "))]
    AnalyzerCycle(Vec<&'static str>),
}

impl From<OrchestrationError> for ShannonError {
    fn from(err: OrchestrationError) -> Self {
        ShannonError::fatal(ErrorCode::SC703, err.to_string())
    }
}

/// Ordered analyzers: wave 1 followed by wave 2.
pub fn resolve_analyzer_order(
    analyzers: Vec<Box<dyn Analyzer>>,
) -> Result<(Vec<Box<dyn Analyzer>>, Vec<Box<dyn Analyzer>>), OrchestrationError> {
    let mut providers: BTreeMap<SlotKind, &'static str> = BTreeMap::new();
    for a in &analyzers {
        for slot in a.provides() {
            if let Some(first) = providers.insert(*slot, a.name()) {
                return Err(OrchestrationError::SlotCollision {
                    slot: *slot,
                    first,
                    second: a.name(),
                });
            }
        }
    }

    let (last, first): (Vec<_>, Vec<_>) = analyzers.into_iter().partition(|a| a.run_last());
    Ok((toposort(first)?, toposort(last)?))
}

fn toposort(wave: Vec<Box<dyn Analyzer>>) -> Result<Vec<Box<dyn Analyzer>>, OrchestrationError> {
    let provider_of: BTreeMap<SlotKind, usize> = wave
        .iter()
        .enumerate()
        .flat_map(|(i, a)| a.provides().iter().map(move |s| (*s, i)))
        .collect();

    // in-wave prerequisites of each analyzer
    let deps: Vec<Vec<usize>> = wave
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let mut d: Vec<usize> = a
                .requires()
                .iter()
                .filter_map(|s| provider_of.get(s).copied())
                .filter(|p| *p != i)
                .collect();
            d.sort_unstable();
            d.dedup();
            d
        })
        .collect();

    let mut indegree: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut done = vec![false; wave.len()];
    let mut order = Vec::with_capacity(wave.len());

    while order.len() < wave.len() {
        let Some(next) = (0..wave.len()).find(|&i| !done[i] && indegree[i] == 0) else {
            let stuck = (0..wave.len()).filter(|&i| !done[i]).map(|i| wave[i].name()).collect();
            return Err(OrchestrationError::AnalyzerCycle(stuck));
        };
        done[next] = true;
        order.push(next);
        for (i, d) in deps.iter().enumerate() {
            if !done[i] && d.contains(&next) {
                indegree[i] -= 1;
            }
        }
    }

    let mut slots: Vec<Option<Box<dyn Analyzer>>> = wave.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShannonResult;
    use crate::store::FactStore;

    struct Fake {
        name: &'static str,
        requires: &'static [SlotKind],
        provides: &'static [SlotKind],
        last: bool,
    }

    impl Analyzer for Fake {
        fn name(&self) -> &'static str {
            self.name
        }
        fn requires(&self) -> &'static [SlotKind] {
            self.requires
        }
        fn provides(&self) -> &'static [SlotKind] {
            self.provides
        }
        fn run_last(&self) -> bool {
            self.last
        }
        fn analyze(&self, _store: &mut FactStore) -> ShannonResult<()> {
            Ok(())
        }
    }

    fn fake(name: &'static str, requires: &'static [SlotKind], provides: &'static [SlotKind]) -> Box<dyn Analyzer> {
        Box::new(Fake {
            name,
            requires,
            provides,
            last: false,
        })
    }

    fn names(v: &[Box<dyn Analyzer>]) -> Vec<&'static str> {
        v.iter().map(|a| a.name()).collect()
    }

    #[test]
    fn test_dependencies_run_first() {
        let (wave1, wave2) = resolve_analyzer_order(vec![
            fake("architecture", &[SlotKind::Structural], &[SlotKind::Architecture]),
            Box::new(Fake {
                name: "fusion",
                requires: &[SlotKind::FileMetrics],
                provides: &[SlotKind::SignalField],
                last: true,
            }),
            fake("structural", &[SlotKind::Roles], &[SlotKind::Structural]),
            fake("semantics", &[SlotKind::FileSyntax], &[SlotKind::Roles]),
        ])
        .unwrap();
        assert_eq!(names(&wave1), vec!["semantics", "structural", "architecture"]);
        assert_eq!(names(&wave2), vec!["fusion"]);
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let (wave1, _) = resolve_analyzer_order(vec![
            fake("b", &[], &[SlotKind::Spectral]),
            fake("a", &[], &[SlotKind::ClonePairs]),
        ])
        .unwrap();
        assert_eq!(names(&wave1), vec!["b", "a"]);
    }

    #[test]
    fn test_slot_collision() {
        let err = resolve_analyzer_order(vec![
            fake("one", &[], &[SlotKind::Churn]),
            fake("two", &[], &[SlotKind::Churn]),
        ])
        .err()
        .unwrap();
        assert_eq!(
            err,
            OrchestrationError::SlotCollision {
                slot: SlotKind::Churn,
                first: "one",
                second: "two"
            }
        );
    }

    #[test]
    fn test_cycle_detected() {
        let err = resolve_analyzer_order(vec![
            fake("x", &[SlotKind::Cochange], &[SlotKind::Churn]),
            fake("y", &[SlotKind::Churn], &[SlotKind::Cochange]),
        ])
        .err()
        .unwrap();
        assert!(matches!(err, OrchestrationError::AnalyzerCycle(ref n) if n == &vec!["x", "y"]));
        assert_eq!(ShannonError::from(err).code, ErrorCode::SC703);
    }
}
