//! One half-sarcomere: regulation, kinetics and mechanical equilibrium per step.

use std::sync::Arc;

use myo_core::{ErrorInfo, MyoError};
use myo_kinetics::KineticScheme;
use myo_lattice::{calcium_from_pca, BindingSiteLattice, Geometry};

use crate::config::{ForceLaw, SimulationOptions, Titin};
use crate::engine::{EngineReport, StochasticTransitionEngine};
use crate::isotype::{IsotypeAssignment, Isotypes, SchemeSource};
use crate::snapshot::Snapshot;
use crate::solver::{Chain, Coupling, MechanicalSystem, SolveReport, SolveSettings};

/// Mechanical boundary condition for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    /// Impose an absolute half-sarcomere length (nm).
    FixedLength {
        /// Target length.
        length: f64,
    },
    /// Change the length by `delta` (nm); zero holds it.
    LengthChange {
        /// Length increment.
        delta: f64,
    },
    /// Find the length at which the tension matches `force` (pN).
    FixedForce {
        /// Target tension.
        force: f64,
    },
}

/// Boundary condition and activation signal for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryCondition {
    /// Mechanical control.
    pub control: Control,
    /// Calcium as pCa; `None` leaves regulatory units untouched.
    pub p_ca: Option<f64>,
}

impl BoundaryCondition {
    /// Hold the current length without touching regulation.
    pub fn hold() -> Self {
        Self {
            control: Control::LengthChange { delta: 0.0 },
            p_ca: None,
        }
    }

    /// Impose an absolute length.
    pub fn fixed_length(length: f64) -> Self {
        Self {
            control: Control::FixedLength { length },
            p_ca: None,
        }
    }

    /// Impose a tension.
    pub fn fixed_force(force: f64) -> Self {
        Self {
            control: Control::FixedForce { force },
            p_ca: None,
        }
    }

    /// Sets the calcium signal.
    pub fn with_pca(mut self, p_ca: f64) -> Self {
        self.p_ca = Some(p_ca);
        self
    }
}

/// Result of a fixed-force search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSolve {
    /// Length found (nm).
    pub length: f64,
    /// Secant estimate of dT/dL at the solution, when one was computed.
    pub slope: Option<f64>,
    /// Trial solves performed.
    pub iterations: usize,
}

/// Owner of the lattice and unit population of one half-sarcomere.
#[derive(Debug, Clone)]
pub struct HalfSarcomere {
    isotypes: IsotypeAssignment,
    lattice: BindingSiteLattice,
    options: SimulationOptions,
    engine: StochasticTransitionEngine,
    length: f64,
    tension: f64,
    passive_tension: f64,
    extracellular_tension: f64,
    time: f64,
    step: u64,
    dt: f64,
    solver_iterations: usize,
    last_residual: f64,
    last_report: EngineReport,
    last_snapshot: Snapshot,
    aborted: bool,
}

impl HalfSarcomere {
    /// Validates the configuration and builds the lattice at rest with every
    /// unit in its scheme's initial state.
    ///
    /// `schemes` is a single scheme or an [`Isotypes`] mix; isotypes are drawn
    /// per unit from the run seed.
    pub fn new(
        schemes: impl Into<Isotypes>,
        geometry: Geometry,
        options: SimulationOptions,
    ) -> Result<Self, MyoError> {
        options.validate(&geometry)?;
        let isotypes = schemes
            .into()
            .assign(geometry.total_units(), options.run.seed);
        let first = isotypes.scheme_for(0).initial_state();
        let mut lattice =
            BindingSiteLattice::new(geometry, first, options.regulation.initially_active)?;
        for unit in 0..lattice.units().len() {
            let initial = isotypes.scheme_for(unit).initial_state();
            if initial != first {
                lattice.set_unit_state(unit, initial, 0.0);
            }
        }
        let engine = StochasticTransitionEngine {
            seed: options.run.seed,
            capture_radius: options.run.capture_radius,
            tie_break: options.run.tie_break,
            parallel: options.run.parallel,
        };
        let length = lattice.geometry().initial_length;
        let mut half_sarcomere = Self {
            isotypes,
            lattice,
            options,
            engine,
            length,
            tension: 0.0,
            passive_tension: 0.0,
            extracellular_tension: 0.0,
            time: 0.0,
            step: 0,
            dt: 0.0,
            solver_iterations: 0,
            last_residual: 0.0,
            last_report: EngineReport::default(),
            last_snapshot: empty_snapshot(),
            aborted: false,
        };
        let (system, positions, titin) = half_sarcomere.assemble(length);
        half_sarcomere.last_residual =
            system.residual(&positions, half_sarcomere.options.run.parallel);
        half_sarcomere.record_forces(&system, &positions, &titin);
        half_sarcomere.last_snapshot = half_sarcomere.snapshot();
        log::info!(
            "half-sarcomere ready: {} units, {} sites, isotypes {:?}, length {:.1} nm, seed {}",
            half_sarcomere.lattice.units().len(),
            half_sarcomere.lattice.sites().len(),
            half_sarcomere.isotypes.counts(),
            length,
            half_sarcomere.options.run.seed
        );
        Ok(half_sarcomere)
    }

    /// Kinetic scheme of the first isotype.
    pub fn scheme(&self) -> &Arc<KineticScheme> {
        &self.isotypes.schemes()[0]
    }

    /// Isotype drawn for every unit.
    pub fn isotypes(&self) -> &IsotypeAssignment {
        &self.isotypes
    }

    /// Current lattice.
    pub fn lattice(&self) -> &BindingSiteLattice {
        &self.lattice
    }

    /// Options in force.
    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    /// Current length (nm).
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Current tension (pN).
    pub fn tension(&self) -> f64 {
        self.tension
    }

    /// Current titin tension (pN).
    pub fn passive_tension(&self) -> f64 {
        self.passive_tension
    }

    /// Current extracellular tension (pN), included in [`HalfSarcomere::tension`].
    pub fn extracellular_tension(&self) -> f64 {
        self.extracellular_tension
    }

    /// Simulated time (s).
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Completed steps.
    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Kinetics report of the most recent step.
    pub fn last_report(&self) -> &EngineReport {
        &self.last_report
    }

    /// Snapshot of the last completed step, or of the initial state.
    pub fn last_snapshot(&self) -> &Snapshot {
        &self.last_snapshot
    }

    /// True once any step has failed.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Refuses every further step.
    pub fn mark_aborted(&mut self) {
        self.aborted = true;
    }

    /// Runs one complete step under `bc`.
    ///
    /// Any error aborts the half-sarcomere; [`HalfSarcomere::last_snapshot`]
    /// still returns the last consistent state.
    pub fn advance(&mut self, bc: &BoundaryCondition, dt: f64) -> Result<Snapshot, MyoError> {
        let result = self.advance_inner(bc, dt);
        if let Err(err) = &result {
            self.aborted = true;
            log::warn!("half-sarcomere aborted at step {}: {}", self.step, err);
        }
        result
    }

    fn advance_inner(&mut self, bc: &BoundaryCondition, dt: f64) -> Result<Snapshot, MyoError> {
        self.begin_step(bc.p_ca, dt)?;
        match bc.control {
            Control::FixedLength { length } => {
                self.solve_length(length)?;
            }
            Control::LengthChange { delta } => {
                self.solve_length(self.length + delta)?;
            }
            Control::FixedForce { force } => {
                self.solve_force(force)?;
            }
        }
        Ok(self.finish_step())
    }

    /// Regulation and kinetics for the step about to run.
    pub fn begin_step(&mut self, p_ca: Option<f64>, dt: f64) -> Result<&EngineReport, MyoError> {
        if self.aborted {
            return Err(MyoError::Consistency(
                ErrorInfo::new("run-aborted", "run was aborted by an earlier error")
                    .with_context("step", self.step),
            ));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(MyoError::Configuration(
                ErrorInfo::new("invalid-timestep", "timestep must be finite and positive")
                    .with_context("dt", dt),
            ));
        }
        self.dt = dt;
        if let Some(p_ca) = p_ca {
            let report = self.lattice.update_regulation(
                &self.options.regulation,
                calcium_from_pca(p_ca),
                dt,
                self.options.run.seed,
                self.step,
            );
            log::trace!(
                "step {}: regulation +{} -{}",
                self.step,
                report.activated,
                report.deactivated
            );
        }
        let node_forces = self.thick_node_forces();
        self.last_report =
            self.engine
                .step(&self.isotypes, &mut self.lattice, &node_forces, dt, self.step)?;
        self.lattice.check_consistency()?;
        Ok(&self.last_report)
    }

    /// Solves equilibrium with the thick filaments anchored at `length`.
    pub fn solve_length(&mut self, length: f64) -> Result<SolveReport, MyoError> {
        if !length.is_finite() {
            return Err(MyoError::Numeric(
                ErrorInfo::new("non-finite-length", "half-sarcomere length is not finite")
                    .with_context("length", length),
            ));
        }
        let (mut system, mut positions, titin) = self.assemble(length);
        let settings = SolveSettings {
            tolerance: self.options.run.tolerance,
            max_iterations: self.options.run.max_iterations,
            parallel: self.options.run.parallel,
        };
        let with_step = |err: MyoError| match err {
            MyoError::Convergence(info) => MyoError::Convergence(
                info.with_context("step", self.step).with_context("length", length),
            ),
            other => other,
        };
        let report = match self.options.mechanics.titin.as_ref() {
            Some(spring) if spring.is_nonlinear() && !titin.is_empty() => {
                solve_nonlinear(&mut system, &mut positions, &settings, spring, &titin)
                    .map_err(with_step)?
            }
            _ => system.solve(&mut positions, &settings).map_err(with_step)?,
        };
        let sites = self.lattice.sites().len();
        self.lattice.set_site_positions(&positions[..sites]);
        self.lattice.set_node_positions(&positions[sites..]);
        self.length = length;
        self.solver_iterations = report.iterations;
        self.last_residual = report.residual;
        self.record_forces(&system, &positions, &titin);
        Ok(report)
    }

    /// Largest net node force left by the most recent equilibrium solve.
    pub fn equilibrium_residual(&self) -> f64 {
        self.last_residual
    }

    /// Tension after an equilibrium solve at `length`.
    pub fn tension_at(&mut self, length: f64) -> Result<f64, MyoError> {
        self.solve_length(length)?;
        Ok(self.tension)
    }

    /// Secant search for the length at which the tension equals `target`.
    ///
    /// Each trial is a full equilibrium solve. Trial lengths stay within
    /// `force_span` of the starting length.
    pub fn solve_force(&mut self, target: f64) -> Result<ForceSolve, MyoError> {
        let run = &self.options.run;
        let (tolerance, span, trial_step, cap) = (
            run.force_tolerance,
            run.force_span,
            run.trial_step,
            run.max_iterations,
        );
        let start = self.length;
        let mut l0 = start;
        let mut f0 = self.tension_at(l0)? - target;
        if f0.abs() < tolerance {
            return Ok(ForceSolve {
                length: l0,
                slope: None,
                iterations: 1,
            });
        }
        let mut l1 = start + if f0 > 0.0 { -trial_step } else { trial_step };
        for iteration in 1..=cap {
            let f1 = self.tension_at(l1)? - target;
            let slope = (f1 - f0) / (l1 - l0);
            if f1.abs() < tolerance {
                return Ok(ForceSolve {
                    length: l1,
                    slope: slope.is_finite().then_some(slope),
                    iterations: iteration + 1,
                });
            }
            if !slope.is_finite() || slope.abs() <= f64::EPSILON {
                return Err(MyoError::Convergence(
                    ErrorInfo::new("zero-force-slope", "tension does not respond to length")
                        .with_context("step", self.step)
                        .with_context("target", target)
                        .with_context("tension", f1 + target)
                        .with_hint("attach titin or wait for bound cross-bridges"),
                ));
            }
            let next = (l1 - f1 / slope).clamp(start - span, start + span);
            if next == l1 {
                return Err(MyoError::Convergence(
                    ErrorInfo::new("force-span-exceeded", "target force lies outside the search span")
                        .with_context("step", self.step)
                        .with_context("target", target)
                        .with_context("span", span),
                ));
            }
            l0 = l1;
            f0 = f1;
            l1 = next;
        }
        Err(MyoError::Convergence(
            ErrorInfo::new("force-search-cap", "fixed-force search exceeded the iteration cap")
                .with_context("step", self.step)
                .with_context("target", target)
                .with_context("max_iterations", cap),
        ))
    }

    /// Refreshes bound distortions from the solved positions, advances the
    /// clock and records the snapshot.
    pub fn finish_step(&mut self) -> Snapshot {
        for unit in 0..self.lattice.units().len() {
            let entry = &self.lattice.units()[unit];
            if let Some(site) = entry.bound_site {
                let extension = self
                    .isotypes
                    .scheme_for(unit)
                    .state(entry.state)
                    .map_or(0.0, |s| s.extension);
                let distortion = self.lattice.node_position(unit)
                    - self.lattice.sites()[site].position
                    + extension;
                self.lattice.set_distortion(unit, distortion);
            }
        }
        self.time += self.dt;
        self.step += 1;
        let snapshot = self.snapshot();
        log::debug!(
            "step {}: t={:.6} L={:.3} T={:.3} fired={} attached={} detached={} vetoed={} iterations={}",
            self.step,
            self.time,
            self.length,
            self.tension,
            self.last_report.fired,
            self.last_report.attached,
            self.last_report.detached,
            self.last_report.vetoed,
            self.solver_iterations
        );
        self.last_snapshot = snapshot.clone();
        snapshot
    }

    fn snapshot(&self) -> Snapshot {
        let units = self.lattice.units();
        let mut populations = vec![0.0; self.isotypes.state_count()];
        for unit in units {
            if let Some(slot) = populations.get_mut(unit.state.index()) {
                *slot += 1.0;
            }
        }
        if !units.is_empty() {
            for value in &mut populations {
                *value /= units.len() as f64;
            }
        }
        let geometry = self.lattice.geometry();
        Snapshot {
            time: self.time,
            step: self.step,
            length: self.length,
            tension: self.tension,
            passive_tension: self.passive_tension,
            extracellular_tension: self.extracellular_tension,
            nodes_per_thick: geometry.nodes_per_thick,
            sites_per_thin: geometry.sites_per_thin(),
            unit_states: units.iter().map(|u| u.state).collect(),
            distortions: units.iter().map(|u| u.distortion).collect(),
            occupancy: self.lattice.sites().iter().map(|s| s.occupant).collect(),
            site_active: self.lattice.sites().iter().map(|s| s.active).collect(),
            populations,
            solver_iterations: self.solver_iterations,
        }
    }

    /// Thick backbone tension at each unit's node from the current positions.
    fn thick_node_forces(&self) -> Vec<f64> {
        let geometry = self.lattice.geometry();
        let stiffness = self.options.mechanics.thick_stiffness;
        let positions = self.lattice.node_positions();
        self.lattice
            .units()
            .iter()
            .enumerate()
            .map(|(index, unit)| {
                let (previous, rest) = if unit.node == 0 {
                    (self.length, geometry.bare_zone)
                } else {
                    (positions[index - 1], geometry.thick_node_spacing)
                };
                stiffness * (previous - positions[index] - rest)
            })
            .collect()
    }

    /// Builds the spring network for `length`: thin chains first, then thick
    /// chains, then bridge and titin couplings. Returns the warm-start
    /// positions and the titin coupling indices.
    fn assemble(&self, length: f64) -> (MechanicalSystem, Vec<f64>, Vec<usize>) {
        let geometry = self.lattice.geometry();
        let mechanics = &self.options.mechanics;
        let per_thin = geometry.sites_per_thin();
        let sites = self.lattice.sites().len();

        let mut chains = Vec::with_capacity(geometry.thin_filaments + geometry.thick_filaments);
        for _ in 0..geometry.thin_filaments {
            chains.push(Chain {
                anchor: 0.0,
                rest: vec![geometry.thin_site_spacing; per_thin],
                stiffness: mechanics.thin_stiffness,
                direction: 1.0,
                fixed: !mechanics.thin_compliant,
            });
        }
        for _ in 0..geometry.thick_filaments {
            let mut rest = vec![geometry.thick_node_spacing; geometry.nodes_per_thick];
            rest[0] = geometry.bare_zone;
            chains.push(Chain {
                anchor: length,
                rest,
                stiffness: mechanics.thick_stiffness,
                direction: -1.0,
                fixed: false,
            });
        }
        let mut system = MechanicalSystem::new(chains);

        let shift = length - self.length;
        let mut positions = Vec::with_capacity(system.node_count());
        positions.extend(self.lattice.sites().iter().map(|s| s.position));
        positions.extend(self.lattice.node_positions().iter().map(|x| x + shift));

        let (stiffness, damping_ratio) = match mechanics.force_law {
            ForceLaw::Viscoelastic { damping } if self.dt > 0.0 => {
                let viscous = damping / self.dt;
                let effective = mechanics.bridge_stiffness + viscous;
                let ratio = if effective > 0.0 { viscous / effective } else { 0.0 };
                (effective, ratio)
            }
            _ => (mechanics.bridge_stiffness, 0.0),
        };
        for (unit, entry) in self.lattice.units().iter().enumerate() {
            if let Some(site) = entry.bound_site {
                let extension = self
                    .isotypes
                    .scheme_for(unit)
                    .state(entry.state)
                    .map_or(0.0, |s| s.extension);
                system.add_coupling(Coupling {
                    a: sites + unit,
                    b: site,
                    stiffness,
                    offset: -extension + damping_ratio * entry.distortion,
                });
            }
        }

        let mut titin_links = Vec::new();
        if let Some(titin) = &mechanics.titin {
            for thick in self.lattice.thick_filaments() {
                let thick_node = sites + thick.units.start + titin.thick_node;
                for &thin in &thick.faced_thin {
                    let a = thin * per_thin + titin.thin_node;
                    let (stiffness, offset) = titin_link(titin, a, thick_node, &positions);
                    titin_links.push(system.add_coupling(Coupling {
                        a,
                        b: thick_node,
                        stiffness,
                        offset,
                    }));
                }
            }
        }
        (system, positions, titin_links)
    }

    fn record_forces(&mut self, system: &MechanicalSystem, positions: &[f64], titin: &[usize]) {
        let thin = self.lattice.geometry().thin_filaments;
        self.extracellular_tension = self
            .options
            .mechanics
            .extracellular
            .as_ref()
            .map_or(0.0, |element| element.force(self.length));
        self.tension = (0..self.lattice.geometry().thick_filaments)
            .map(|t| system.segment_tension(thin + t, 0, positions))
            .sum::<f64>()
            + self.extracellular_tension;
        self.passive_tension = titin
            .iter()
            .map(|&index| system.couplings()[index].force_on_a(positions))
            .sum();
    }
}

/// Linear coupling tangent to the titin curve at the current separation of
/// nodes `a` (thin) and `b` (thick).
fn titin_link(titin: &Titin, a: usize, b: usize, positions: &[f64]) -> (f64, f64) {
    if !titin.is_nonlinear() {
        return (titin.stiffness, -titin.slack_length);
    }
    let extension = positions[b] - positions[a] - titin.slack_length;
    let slope = titin.slope(extension);
    if slope > 0.0 {
        (
            slope,
            titin.force(extension) / slope - extension - titin.slack_length,
        )
    } else {
        (0.0, -titin.slack_length)
    }
}

/// Newton iteration over nonlinear titin links: solve the linearised network,
/// re-linearise every link at the new positions and repeat until the true
/// residual drops below the tolerance. Sweeps are summed into the report.
fn solve_nonlinear(
    system: &mut MechanicalSystem,
    positions: &mut [f64],
    settings: &SolveSettings,
    titin: &Titin,
    links: &[usize],
) -> Result<SolveReport, MyoError> {
    let mut sweeps = 0;
    let mut residual = f64::INFINITY;
    for pass in 1..=settings.max_iterations {
        sweeps += system.solve(positions, settings)?.iterations;
        for &index in links {
            let coupling = system.couplings()[index];
            let (stiffness, offset) = titin_link(titin, coupling.a, coupling.b, positions);
            system.relink(index, stiffness, offset);
        }
        residual = system.residual(positions, settings.parallel);
        if !residual.is_finite() {
            return Err(MyoError::Numeric(
                ErrorInfo::new("non-finite-residual", "titin force diverged")
                    .with_context("pass", pass),
            ));
        }
        if residual < settings.tolerance {
            return Ok(SolveReport {
                iterations: sweeps,
                residual,
            });
        }
    }
    Err(MyoError::Convergence(
        ErrorInfo::new(
            "titin-linearization-cap",
            "nonlinear titin did not converge within the iteration cap",
        )
        .with_context("max_iterations", settings.max_iterations)
        .with_context("residual", residual)
        .with_context("tolerance", settings.tolerance)
        .with_hint("raise max_iterations or soften the titin curve"),
    ))
}

fn empty_snapshot() -> Snapshot {
    Snapshot {
        time: 0.0,
        step: 0,
        length: 0.0,
        tension: 0.0,
        passive_tension: 0.0,
        extracellular_tension: 0.0,
        nodes_per_thick: 0,
        sites_per_thin: 0,
        unit_states: Vec::new(),
        distortions: Vec::new(),
        occupancy: Vec::new(),
        site_active: Vec::new(),
        populations: Vec::new(),
        solver_iterations: 0,
    }
}
