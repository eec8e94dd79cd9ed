//! Iterative force-balance solver for chains of springs coupled by linear links.
//!
//! Each chain is a series of nodes joined by springs and anchored at one end.
//! Couplings join arbitrary node pairs. A sweep solves every compliant chain
//! exactly (tridiagonal) with the other chains frozen at their latest
//! positions; sweeps repeat until the largest net node force drops below the
//! tolerance.

use myo_core::{ErrorInfo, MyoError};
use rayon::prelude::*;

/// A spring chain anchored at `anchor`.
///
/// Node `k` sits nominally at `anchor + direction * (rest[0] + ... + rest[k])`.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    /// Position of the fixed end.
    pub anchor: f64,
    /// Rest length of each segment; segment 0 joins the anchor to node 0.
    pub rest: Vec<f64>,
    /// Segment stiffness.
    pub stiffness: f64,
    /// `+1.0` when nodes lie at larger x than the anchor, `-1.0` otherwise.
    pub direction: f64,
    /// Fixed chains keep their current positions and are excluded from the residual.
    pub fixed: bool,
}

impl Chain {
    /// Rest positions of every node.
    pub fn rest_positions(&self) -> Vec<f64> {
        let mut x = self.anchor;
        self.rest
            .iter()
            .map(|r| {
                x += self.direction * r;
                x
            })
            .collect()
    }
}

/// Linear link between nodes `a` and `b`.
///
/// The force on `a` is `stiffness * (x_b - x_a + offset)`; `b` receives the opposite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coupling {
    /// First node.
    pub a: usize,
    /// Second node.
    pub b: usize,
    /// Link stiffness.
    pub stiffness: f64,
    /// Offset added to the separation.
    pub offset: f64,
}

impl Coupling {
    /// Force acting on node `a`.
    pub fn force_on_a(&self, positions: &[f64]) -> f64 {
        self.stiffness * (positions[self.b] - positions[self.a] + self.offset)
    }
}

/// Convergence settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveSettings {
    /// Largest accepted net node force.
    pub tolerance: f64,
    /// Sweep cap; zero always fails.
    pub max_iterations: usize,
    /// Compute residuals on the rayon pool.
    pub parallel: bool,
}

/// Outcome of a converged solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    /// Sweeps performed.
    pub iterations: usize,
    /// Largest net node force after the last sweep.
    pub residual: f64,
}

/// Chains, couplings and external loads over a flat node vector.
#[derive(Debug, Clone, Default)]
pub struct MechanicalSystem {
    chains: Vec<Chain>,
    offsets: Vec<usize>,
    owner: Vec<(usize, usize)>,
    couplings: Vec<Coupling>,
    incident: Vec<Vec<usize>>,
    loads: Vec<f64>,
}

impl MechanicalSystem {
    /// Lays the chains out consecutively in the node vector.
    pub fn new(chains: Vec<Chain>) -> Self {
        let mut offsets = Vec::with_capacity(chains.len());
        let mut owner = Vec::new();
        for (c, chain) in chains.iter().enumerate() {
            offsets.push(owner.len());
            owner.extend((0..chain.rest.len()).map(|k| (c, k)));
        }
        let nodes = owner.len();
        Self {
            chains,
            offsets,
            owner,
            couplings: Vec::new(),
            incident: vec![Vec::new(); nodes],
            loads: vec![0.0; nodes],
        }
    }

    /// Total node count.
    pub fn node_count(&self) -> usize {
        self.owner.len()
    }

    /// Chains in layout order.
    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// Global index of node `local` on chain `chain`.
    pub fn node_index(&self, chain: usize, local: usize) -> usize {
        self.offsets[chain] + local
    }

    /// Adds a coupling and returns its index.
    pub fn add_coupling(&mut self, coupling: Coupling) -> usize {
        let index = self.couplings.len();
        self.incident[coupling.a].push(index);
        self.incident[coupling.b].push(index);
        self.couplings.push(coupling);
        index
    }

    /// Replaces the stiffness and offset of coupling `index`, keeping its endpoints.
    pub fn relink(&mut self, index: usize, stiffness: f64, offset: f64) {
        let coupling = &mut self.couplings[index];
        coupling.stiffness = stiffness;
        coupling.offset = offset;
    }

    /// Couplings in insertion order.
    pub fn couplings(&self) -> &[Coupling] {
        &self.couplings
    }

    /// Applies an external force at `node`.
    pub fn set_load(&mut self, node: usize, force: f64) {
        self.loads[node] = force;
    }

    /// Rest positions of every node.
    pub fn rest_positions(&self) -> Vec<f64> {
        self.chains.iter().flat_map(Chain::rest_positions).collect()
    }

    /// Tension in segment `local` of `chain`; segment 0 is the anchor segment.
    pub fn segment_tension(&self, chain: usize, local: usize, positions: &[f64]) -> f64 {
        let segment = &self.chains[chain];
        let base = self.offsets[chain];
        let previous = if local == 0 {
            segment.anchor
        } else {
            positions[base + local - 1]
        };
        segment.stiffness
            * (segment.direction * (positions[base + local] - previous) - segment.rest[local])
    }

    /// Net force on `node`.
    pub fn net_force(&self, node: usize, positions: &[f64]) -> f64 {
        let (c, k) = self.owner[node];
        let chain = &self.chains[c];
        let mut force = self.loads[node] - chain.direction * self.segment_tension(c, k, positions);
        if k + 1 < chain.rest.len() {
            force += chain.direction * self.segment_tension(c, k + 1, positions);
        }
        for &index in &self.incident[node] {
            let coupling = &self.couplings[index];
            let on_a = coupling.force_on_a(positions);
            if coupling.a == node {
                force += on_a;
            }
            if coupling.b == node {
                force -= on_a;
            }
        }
        force
    }

    /// Largest absolute net force over compliant nodes.
    pub fn residual(&self, positions: &[f64], parallel: bool) -> f64 {
        let compliant = |node: &usize| !self.chains[self.owner[*node].0].fixed;
        if parallel {
            (0..self.node_count())
                .into_par_iter()
                .filter(compliant)
                .map(|node| self.net_force(node, positions).abs())
                .reduce(|| 0.0, f64::max)
        } else {
            (0..self.node_count())
                .filter(compliant)
                .map(|node| self.net_force(node, positions).abs())
                .fold(0.0, f64::max)
        }
    }

    /// Relaxes `positions` to equilibrium.
    ///
    /// Fails with a convergence error when `max_iterations` sweeps do not bring
    /// the residual below the tolerance, or a numeric error when positions
    /// become non-finite. `positions` hold the last sweep on failure.
    pub fn solve(
        &self,
        positions: &mut [f64],
        settings: &SolveSettings,
    ) -> Result<SolveReport, MyoError> {
        let mut residual = f64::INFINITY;
        let mut scratch = Scratch::default();
        for iteration in 1..=settings.max_iterations {
            for (c, chain) in self.chains.iter().enumerate() {
                if !chain.fixed {
                    self.relax_chain(c, positions, &mut scratch);
                }
            }
            residual = self.residual(positions, settings.parallel);
            if !residual.is_finite() {
                return Err(MyoError::Numeric(
                    ErrorInfo::new("non-finite-residual", "equilibrium solve diverged")
                        .with_context("iteration", iteration),
                ));
            }
            if residual < settings.tolerance {
                return Ok(SolveReport {
                    iterations: iteration,
                    residual,
                });
            }
        }
        Err(MyoError::Convergence(
            ErrorInfo::new(
                "solver-iteration-cap",
                "mechanical solve did not converge within the iteration cap",
            )
            .with_context("max_iterations", settings.max_iterations)
            .with_context("residual", residual)
            .with_context("tolerance", settings.tolerance)
            .with_hint("raise max_iterations or loosen the tolerance"),
        ))
    }

    fn relax_chain(&self, c: usize, positions: &mut [f64], scratch: &mut Scratch) {
        let chain = &self.chains[c];
        let n = chain.rest.len();
        if n == 0 {
            return;
        }
        let base = self.offsets[c];
        let k = chain.stiffness;
        let s = chain.direction;
        scratch.reset(n);
        for local in 0..n {
            let node = base + local;
            let last = local + 1 == n;
            let mut diag = if last { k } else { 2.0 * k };
            let mut rhs = s * k * chain.rest[local] + self.loads[node];
            if !last {
                rhs -= s * k * chain.rest[local + 1];
            }
            if local == 0 {
                rhs += k * chain.anchor;
            }
            for &index in &self.incident[node] {
                let coupling = &self.couplings[index];
                if coupling.a == node && coupling.b == node {
                    continue;
                }
                diag += coupling.stiffness;
                if coupling.a == node {
                    rhs += coupling.stiffness * (positions[coupling.b] + coupling.offset);
                } else {
                    rhs += coupling.stiffness * (positions[coupling.a] - coupling.offset);
                }
            }
            scratch.lower[local] = if local == 0 { 0.0 } else { -k };
            scratch.upper[local] = if last { 0.0 } else { -k };
            scratch.diag[local] = diag;
            scratch.rhs[local] = rhs;
        }
        thomas(scratch);
        positions[base..base + n].copy_from_slice(&scratch.rhs[..n]);
    }
}

#[derive(Debug, Default)]
struct Scratch {
    lower: Vec<f64>,
    diag: Vec<f64>,
    upper: Vec<f64>,
    rhs: Vec<f64>,
}

impl Scratch {
    fn reset(&mut self, n: usize) {
        for buffer in [&mut self.lower, &mut self.diag, &mut self.upper, &mut self.rhs] {
            buffer.clear();
            buffer.resize(n, 0.0);
        }
    }
}

/// Solves the tridiagonal system in place; the solution replaces `rhs`.
fn thomas(system: &mut Scratch) {
    let n = system.diag.len();
    for i in 1..n {
        let w = system.lower[i] / system.diag[i - 1];
        system.diag[i] -= w * system.upper[i - 1];
        system.rhs[i] -= w * system.rhs[i - 1];
    }
    system.rhs[n - 1] /= system.diag[n - 1];
    for i in (0..n - 1).rev() {
        system.rhs[i] = (system.rhs[i] - system.upper[i] * system.rhs[i + 1]) / system.diag[i];
    }
}
