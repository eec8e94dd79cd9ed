//! Per-timestep stochastic transitions for every cross-bridge unit.
//!
//! Evaluation runs in two phases. The plan phase is independent per unit and
//! may run in parallel: it evaluates rates, consumes the unit's counter-based
//! draw and picks a transition. The apply phase walks units in ascending
//! order and performs lattice side effects, so binding-site conflicts resolve
//! in favour of the lower unit index.

use myo_core::rng::STREAM_KINETICS;
use myo_core::{counter_uniform, ErrorInfo, MyoError, StateId, UnitIndex};
use myo_kinetics::{KineticScheme, RateContext, TransitionKind};
use myo_lattice::{BindingSiteLattice, TieBreak};
use rayon::prelude::*;

use crate::isotype::SchemeSource;

/// What happened to a unit during one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// The draw did not fall below the firing threshold.
    Stay,
    /// A transition fired and was applied.
    Fired {
        /// Index into the scheme's transition list.
        transition: usize,
        /// New state.
        to: StateId,
    },
    /// An attach transition fired but no site was available within the capture radius.
    Vetoed {
        /// Index into the scheme's transition list.
        transition: usize,
    },
}

/// Per-unit record of one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDecision {
    /// Unit index.
    pub unit: UnitIndex,
    /// State before the step.
    pub state: StateId,
    /// Sum of outgoing rates.
    pub propensity: f64,
    /// `1 - exp(-propensity * dt)`.
    pub threshold: f64,
    /// The unit's uniform draw for this step.
    pub draw: f64,
    /// Resulting action.
    pub outcome: Outcome,
}

/// Summary of one kinetics step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineReport {
    /// One record per unit, in unit order.
    pub decisions: Vec<UnitDecision>,
    /// Transitions applied.
    pub fired: usize,
    /// Attachments applied.
    pub attached: usize,
    /// Detachments applied.
    pub detached: usize,
    /// Attachments vetoed for lack of a site.
    pub vetoed: usize,
}

/// Stateless transition engine configured for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticTransitionEngine {
    /// Master seed of the kinetics stream.
    pub seed: u64,
    /// Exclusive capture radius (nm).
    pub capture_radius: f64,
    /// Ordering among equidistant sites.
    pub tie_break: TieBreak,
    /// Plan units on the rayon pool.
    pub parallel: bool,
}

#[derive(Debug, Clone, Copy)]
struct Plan {
    state: StateId,
    propensity: f64,
    threshold: f64,
    draw: f64,
    transition: Option<usize>,
}

impl StochasticTransitionEngine {
    /// Advances every unit by one step of length `dt`.
    ///
    /// `node_forces[u]` is the backbone tension at unit `u`'s node. Unit `u`
    /// follows `schemes.scheme_for(u)` and consumes the draw at counter
    /// `(step, u)` on the kinetics stream.
    pub fn step<S: SchemeSource + ?Sized>(
        &self,
        schemes: &S,
        lattice: &mut BindingSiteLattice,
        node_forces: &[f64],
        dt: f64,
        step: u64,
    ) -> Result<EngineReport, MyoError> {
        let units = lattice.units().len();
        let plans: Vec<Plan> = {
            let view: &BindingSiteLattice = lattice;
            let plan = |unit: UnitIndex| {
                self.plan(schemes.scheme_for(unit), view, node_forces, dt, step, unit)
            };
            if self.parallel {
                (0..units).into_par_iter().map(plan).collect::<Result<Vec<Plan>, MyoError>>()?
            } else {
                (0..units).map(plan).collect::<Result<Vec<Plan>, MyoError>>()?
            }
        };

        let mut report = EngineReport {
            decisions: Vec::with_capacity(units),
            ..EngineReport::default()
        };
        for (unit, plan) in plans.into_iter().enumerate() {
            let outcome = match plan.transition {
                None => Outcome::Stay,
                Some(index) => {
                    self.apply(schemes.scheme_for(unit), lattice, unit, index, &mut report)?
                }
            };
            report.decisions.push(UnitDecision {
                unit,
                state: plan.state,
                propensity: plan.propensity,
                threshold: plan.threshold,
                draw: plan.draw,
                outcome,
            });
        }
        Ok(report)
    }

    fn plan(
        &self,
        scheme: &KineticScheme,
        lattice: &BindingSiteLattice,
        node_forces: &[f64],
        dt: f64,
        step: u64,
        unit: UnitIndex,
    ) -> Result<Plan, MyoError> {
        let entry = &lattice.units()[unit];
        let state = entry.state;
        if !scheme.contains(state) {
            return Err(MyoError::Consistency(
                ErrorInfo::new("unknown-state", "unit holds a state outside the scheme")
                    .with_context("unit", unit)
                    .with_context("state", state),
            ));
        }
        let site_distance = if entry.bound_site.is_none() && scheme.needs_site_distance(state) {
            lattice
                .nearest_available(unit, self.tie_break)
                .map(|candidate| candidate.offset)
        } else {
            None
        };
        let ctx = RateContext {
            distortion: entry.distortion,
            site_distance,
            node_force: node_forces.get(unit).copied().unwrap_or(0.0),
        };
        let rates = scheme.evaluate(state, &ctx).map_err(|err| match err {
            MyoError::Numeric(info) => MyoError::Numeric(info.with_context("unit", unit)),
            other => other,
        })?;
        let propensity: f64 = rates.iter().map(|(_, rate)| rate).sum();
        let threshold = 1.0 - (-propensity * dt).exp();
        let draw = counter_uniform(self.seed, STREAM_KINETICS, step, unit as u64);

        let transition = if draw < threshold {
            let target = draw / threshold * propensity;
            let indices = scheme.outgoing_indices(state);
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (position, (_, rate)) in rates.iter().enumerate() {
                if *rate <= 0.0 {
                    continue;
                }
                cumulative += rate;
                chosen = Some(indices[position]);
                if cumulative > target {
                    break;
                }
            }
            chosen
        } else {
            None
        };

        Ok(Plan {
            state,
            propensity,
            threshold,
            draw,
            transition,
        })
    }

    fn apply(
        &self,
        scheme: &KineticScheme,
        lattice: &mut BindingSiteLattice,
        unit: UnitIndex,
        index: usize,
        report: &mut EngineReport,
    ) -> Result<Outcome, MyoError> {
        let transition = &scheme.transitions()[index];
        let from_extension = scheme.state(transition.from).map_or(0.0, |s| s.extension);
        let to_extension = scheme.state(transition.to).map_or(0.0, |s| s.extension);
        let distortion = lattice.units()[unit].distortion;

        match transition.kind {
            TransitionKind::Attach => {
                let Some(candidate) = lattice
                    .available_sites_within(unit, self.capture_radius, self.tie_break)
                    .first()
                    .copied()
                else {
                    report.vetoed += 1;
                    return Ok(Outcome::Vetoed { transition: index });
                };
                lattice.bind(unit, candidate.site)?;
                lattice.set_unit_state(unit, transition.to, to_extension - candidate.offset);
                report.attached += 1;
            }
            TransitionKind::Detach => {
                if lattice.release(unit)?.is_none() {
                    return Err(MyoError::Consistency(
                        ErrorInfo::new("detach-without-site", "detaching unit holds no site")
                            .with_context("unit", unit)
                            .with_context("transition", index),
                    ));
                }
                lattice.set_unit_state(unit, transition.to, scheme.reset_distortion());
                report.detached += 1;
            }
            TransitionKind::Neutral => {
                let attached = scheme
                    .kind_of(transition.to)
                    .is_some_and(|kind| kind.is_attached());
                let next = if attached {
                    distortion + to_extension - from_extension
                } else {
                    distortion
                };
                lattice.set_unit_state(unit, transition.to, next);
            }
        }
        report.fired += 1;
        Ok(Outcome::Fired {
            transition: index,
            to: transition.to,
        })
    }
}
