use myo_core::{MyoError, StateId};
use serde::{Deserialize, Serialize};

use crate::rate::RateContext;
use crate::scheme::KineticScheme;

/// One transition's rate sampled across a distortion grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateColumn {
    /// Source state.
    pub from: StateId,
    /// Target state.
    pub to: StateId,
    /// `"<from label>-><to label>"`.
    pub label: String,
    /// Clamped rates, one per grid point.
    pub rates: Vec<f64>,
}

/// Rates of every transition over a distortion grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    /// Grid of distortions (nm).
    pub distortions: Vec<f64>,
    /// One column per transition in definition order.
    pub columns: Vec<RateColumn>,
}

/// Samples every transition at each distortion in `xs`.
///
/// Distance-dependent laws see a site exactly `x` away and force-dependent
/// laws see an unloaded backbone.
pub fn rate_table(scheme: &KineticScheme, xs: &[f64]) -> Result<RateTable, MyoError> {
    let mut columns: Vec<RateColumn> = scheme
        .transitions()
        .iter()
        .map(|t| RateColumn {
            from: t.from,
            to: t.to,
            label: format!("{}->{}", label(scheme, t.from), label(scheme, t.to)),
            rates: Vec::with_capacity(xs.len()),
        })
        .collect();
    let mut per_state = Vec::new();
    for &x in xs {
        let ctx = RateContext {
            distortion: x,
            site_distance: Some(x),
            node_force: 0.0,
        };
        for state in scheme.states() {
            scheme.evaluate_into(state.id, &ctx, &mut per_state)?;
            let mut rates = per_state.iter();
            for (column, transition) in columns.iter_mut().zip(scheme.transitions()) {
                if transition.from == state.id {
                    if let Some((_, rate)) = rates.next() {
                        column.rates.push(*rate);
                    }
                }
            }
        }
    }
    Ok(RateTable {
        distortions: xs.to_vec(),
        columns,
    })
}

fn label(scheme: &KineticScheme, id: StateId) -> String {
    scheme
        .state(id)
        .map(|s| s.label.clone())
        .unwrap_or_else(|| id.to_string())
}
