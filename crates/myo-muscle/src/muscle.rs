//! Half-sarcomeres in series sharing one tension.

use myo_core::{derive_substream_seed, ErrorInfo, MyoError};
use myo_hs::{HalfSarcomere, Isotypes, SimulationOptions, Snapshot};
use myo_lattice::Geometry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::series::SeriesElement;

/// Muscle-level boundary condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MuscleControl {
    /// Impose the total length (nm).
    Length {
        /// Target length.
        length: f64,
    },
    /// Change the total length by `delta` (nm).
    LengthChange {
        /// Length increment.
        delta: f64,
    },
    /// Impose the shared tension (pN).
    Force {
        /// Target tension.
        force: f64,
    },
}

/// Boundary condition and calcium signal for one muscle step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MuscleBoundary {
    /// Mechanical control.
    pub control: MuscleControl,
    /// Calcium as pCa; `None` leaves regulation untouched.
    pub p_ca: Option<f64>,
}

impl MuscleBoundary {
    /// Hold the current length.
    pub fn hold() -> Self {
        Self {
            control: MuscleControl::LengthChange { delta: 0.0 },
            p_ca: None,
        }
    }

    /// Sets the calcium signal.
    pub fn with_pca(mut self, p_ca: f64) -> Self {
        self.p_ca = Some(p_ca);
        self
    }
}

/// Muscle composition loaded by an external driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleConfig {
    /// Half-sarcomeres in series.
    #[serde(default = "default_half_sarcomeres")]
    pub half_sarcomeres: usize,
    /// Optional series elastic element.
    #[serde(default)]
    pub series: Option<SeriesElement>,
}

fn default_half_sarcomeres() -> usize {
    1
}

impl Default for MuscleConfig {
    fn default() -> Self {
        Self {
            half_sarcomeres: default_half_sarcomeres(),
            series: None,
        }
    }
}

/// Aggregate state after one muscle step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleSnapshot {
    /// Simulated time (s).
    pub time: f64,
    /// Sum of half-sarcomere lengths plus series extension (nm).
    pub length: f64,
    /// Shared tension (pN).
    pub tension: f64,
    /// Series element extension (nm).
    pub series_extension: f64,
    /// One snapshot per half-sarcomere, in series order.
    pub half_sarcomeres: Vec<Snapshot>,
}

/// Ordered series of half-sarcomeres.
#[derive(Debug, Clone)]
pub struct Muscle {
    members: Vec<HalfSarcomere>,
    series: Option<SeriesElement>,
    parallel: bool,
    max_iterations: usize,
    force_tolerance: f64,
    trial_step: f64,
    last_snapshot: MuscleSnapshot,
    aborted: bool,
}

impl Muscle {
    /// Builds `config.half_sarcomeres` identical members; member `i` runs on
    /// the seed derived from the master seed and `i`, which also draws its
    /// isotype assignment.
    pub fn new(
        schemes: impl Into<Isotypes>,
        geometry: Geometry,
        options: SimulationOptions,
        config: &MuscleConfig,
    ) -> Result<Self, MyoError> {
        if config.half_sarcomeres == 0 {
            return Err(MyoError::configuration(
                "empty-muscle",
                "a muscle needs at least one half-sarcomere",
            ));
        }
        let isotypes = schemes.into();
        let master = options.run.seed;
        let members = (0..config.half_sarcomeres)
            .map(|index| {
                let mut member = options.clone();
                member.run.seed = derive_substream_seed(master, index as u64);
                HalfSarcomere::new(isotypes.clone(), geometry.clone(), member)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_members(members, config.series)
    }

    /// Wraps already built half-sarcomeres. Solver settings are taken from the first.
    pub fn from_members(
        members: Vec<HalfSarcomere>,
        series: Option<SeriesElement>,
    ) -> Result<Self, MyoError> {
        let first = members.first().ok_or_else(|| {
            MyoError::configuration("empty-muscle", "a muscle needs at least one half-sarcomere")
        })?;
        if let Some(element) = &series {
            element.validate()?;
        }
        let run = &first.options().run;
        let (parallel, max_iterations, force_tolerance, trial_step) =
            (run.parallel, run.max_iterations, run.force_tolerance, run.trial_step);
        let mut muscle = Self {
            members,
            series,
            parallel,
            max_iterations,
            force_tolerance,
            trial_step,
            last_snapshot: MuscleSnapshot {
                time: 0.0,
                length: 0.0,
                tension: 0.0,
                series_extension: 0.0,
                half_sarcomeres: Vec::new(),
            },
            aborted: false,
        };
        let snapshots = muscle
            .members
            .iter()
            .map(|hs| hs.last_snapshot().clone())
            .collect();
        muscle.last_snapshot = muscle.aggregate(snapshots);
        log::info!(
            "muscle ready: {} half-sarcomeres, series element {}",
            muscle.members.len(),
            if muscle.series.is_some() { "on" } else { "off" }
        );
        Ok(muscle)
    }

    /// Members in series order.
    pub fn half_sarcomeres(&self) -> &[HalfSarcomere] {
        &self.members
    }

    /// Series element, if any.
    pub fn series(&self) -> Option<&SeriesElement> {
        self.series.as_ref()
    }

    /// Aggregate of the last completed step.
    pub fn last_snapshot(&self) -> &MuscleSnapshot {
        &self.last_snapshot
    }

    /// Current total length (nm).
    pub fn length(&self) -> f64 {
        self.last_snapshot.length
    }

    /// True once a step has failed.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Runs kinetics in every member, distributes the boundary condition and
    /// returns the aggregate.
    ///
    /// Any member failure aborts the whole muscle.
    pub fn advance(&mut self, bc: &MuscleBoundary, dt: f64) -> Result<MuscleSnapshot, MyoError> {
        if self.aborted {
            return Err(MyoError::Consistency(ErrorInfo::new(
                "run-aborted",
                "muscle was aborted by an earlier error",
            )));
        }
        match self.advance_inner(bc, dt) {
            Ok(snapshot) => {
                self.last_snapshot = snapshot.clone();
                Ok(snapshot)
            }
            Err(err) => {
                self.aborted = true;
                for member in &mut self.members {
                    member.mark_aborted();
                }
                log::warn!("muscle aborted: {err}");
                Err(err)
            }
        }
    }

    fn advance_inner(&mut self, bc: &MuscleBoundary, dt: f64) -> Result<MuscleSnapshot, MyoError> {
        let p_ca = bc.p_ca;
        if self.parallel {
            self.members
                .par_iter_mut()
                .try_for_each(|hs| hs.begin_step(p_ca, dt).map(|_| ()))?;
        } else {
            for hs in &mut self.members {
                hs.begin_step(p_ca, dt)?;
            }
        }

        match bc.control {
            MuscleControl::Force { force } => self.impose_force(force)?,
            MuscleControl::Length { length } => self.impose_length(length)?,
            MuscleControl::LengthChange { delta } => {
                let target = self.last_snapshot.length + delta;
                self.impose_length(target)?;
            }
        }

        let snapshots = self.members.iter_mut().map(|hs| hs.finish_step()).collect();
        Ok(self.aggregate(snapshots))
    }

    fn impose_force(&mut self, force: f64) -> Result<(), MyoError> {
        if self.parallel {
            self.members
                .par_iter_mut()
                .try_for_each(|hs| hs.solve_force(force).map(|_| ()))
        } else {
            for hs in &mut self.members {
                hs.solve_force(force)?;
            }
            Ok(())
        }
    }

    /// Newton iteration on the shared tension using finite-difference
    /// stiffness of each member.
    fn impose_length(&mut self, target: f64) -> Result<(), MyoError> {
        if self.members.len() == 1 && self.series.is_none() {
            self.members[0].solve_length(target)?;
            return Ok(());
        }
        let compliance = self.series.map_or(0.0, |s| s.compliance());
        for iteration in 1..=self.max_iterations {
            let mut responses = Vec::with_capacity(self.members.len());
            for (index, hs) in self.members.iter_mut().enumerate() {
                let length = hs.length();
                let tension = hs.tension_at(length)?;
                let stretched = hs.tension_at(length + self.trial_step)?;
                let stiffness = (stretched - tension) / self.trial_step;
                if !stiffness.is_finite() || stiffness <= f64::EPSILON {
                    return Err(MyoError::Convergence(
                        ErrorInfo::new("zero-stiffness", "half-sarcomere does not resist stretch")
                            .with_context("half_sarcomere", index)
                            .with_context("stiffness", stiffness)
                            .with_hint("attach titin so slack members carry load"),
                    ));
                }
                responses.push((length, tension, stiffness));
            }

            let total: f64 = responses.iter().map(|(l, _, _)| l).sum();
            let offset: f64 = responses.iter().map(|(_, t, k)| t / k).sum();
            let flexibility: f64 = responses.iter().map(|(_, _, k)| 1.0 / k).sum();
            let shared = (target - total + offset) / (flexibility + compliance);

            let mut mismatch: f64 = 0.0;
            for (hs, (length, tension, stiffness)) in self.members.iter_mut().zip(&responses) {
                let next = length + (shared - tension) / stiffness;
                let reached = hs.tension_at(next)?;
                mismatch = mismatch.max((reached - shared).abs());
            }
            log::trace!("muscle length iteration {iteration}: tension {shared:.4}, mismatch {mismatch:.2e}");
            if mismatch < self.force_tolerance {
                return Ok(());
            }
        }
        Err(MyoError::Convergence(
            ErrorInfo::new(
                "series-iteration-cap",
                "series tension did not equalize within the iteration cap",
            )
            .with_context("max_iterations", self.max_iterations)
            .with_context("target", target),
        ))
    }

    fn aggregate(&self, snapshots: Vec<Snapshot>) -> MuscleSnapshot {
        let count = snapshots.len().max(1) as f64;
        let tension = snapshots.iter().map(|s| s.tension).sum::<f64>() / count;
        let series_extension = self.series.map_or(0.0, |s| s.extension(tension));
        MuscleSnapshot {
            time: snapshots.first().map_or(0.0, |s| s.time),
            length: snapshots.iter().map(|s| s.length).sum::<f64>() + series_extension,
            tension,
            series_extension,
            half_sarcomeres: snapshots,
        }
    }
}
