// Health Laplacian
//
// delta_h(f) = raw_risk(f) − mean raw_risk over f's undirected neighbours
// inside the field. Positive values mark a file riskier than everything
// around it.

use std::collections::BTreeMap;

use super::models::SignalField;
use crate::graph::DependencyGraph;

pub fn compute_delta_h(field: &SignalField, graph: &DependencyGraph) -> BTreeMap<String, f64> {
    field
        .per_file
        .iter()
        .map(|(path, fs)| {
            let risks: Vec<f64> = graph
                .neighbors(path)
                .into_iter()
                .filter_map(|n| field.per_file.get(n))
                .map(|n| n.raw_risk)
                .collect();
            let delta = if risks.is_empty() {
                0.0
            } else {
                fs.raw_risk - risks.iter().sum::<f64>() / risks.len() as f64
            };
            (path.clone(), delta)
        })
        .collect()
}
