use myo_core::{SiteIndex, UnitIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::lattice::BindingSiteLattice;

/// Rule ordering candidate sites that sit at exactly the same distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Lower global site index first.
    LowestIndex,
    /// Higher global site index first.
    HighestIndex,
}

/// Tie-break rule used unless run options say otherwise.
pub const DEFAULT_TIE_BREAK: TieBreak = TieBreak::LowestIndex;

impl Default for TieBreak {
    fn default() -> Self {
        DEFAULT_TIE_BREAK
    }
}

/// A site returned by a geometric query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteCandidate {
    /// Global site index.
    pub site: SiteIndex,
    /// Signed offset from the query position to the site (nm).
    pub offset: f64,
}

impl SiteCandidate {
    /// Unsigned distance.
    pub fn distance(&self) -> f64 {
        self.offset.abs()
    }
}

/// Orders candidates by ascending distance, then by the tie-break rule.
pub fn order_candidates(candidates: &mut [SiteCandidate], tie_break: TieBreak) {
    candidates.sort_by(|a, b| compare(a, b, tie_break));
}

fn compare(a: &SiteCandidate, b: &SiteCandidate, tie_break: TieBreak) -> Ordering {
    a.distance()
        .total_cmp(&b.distance())
        .then_with(|| match tie_break {
            TieBreak::LowestIndex => a.site.cmp(&b.site),
            TieBreak::HighestIndex => b.site.cmp(&a.site),
        })
}

impl BindingSiteLattice {
    /// Available (active, unoccupied) sites on `thin` filaments strictly within
    /// `radius` of `position`, nearest first.
    pub fn available_sites_near(
        &self,
        position: f64,
        radius: f64,
        thin: &[usize],
        tie_break: TieBreak,
    ) -> Vec<SiteCandidate> {
        let mut candidates: Vec<SiteCandidate> = self
            .available_on(position, thin)
            .filter(|candidate| candidate.distance() < radius)
            .collect();
        order_candidates(&mut candidates, tie_break);
        candidates
    }

    /// Available sites within `radius` of `unit`'s node on the filaments it faces.
    pub fn available_sites_within(
        &self,
        unit: UnitIndex,
        radius: f64,
        tie_break: TieBreak,
    ) -> Vec<SiteCandidate> {
        let Some(entry) = self.unit(unit) else {
            return Vec::new();
        };
        let faced = &self.thick_filaments()[entry.thick].faced_thin;
        self.available_sites_near(self.node_position(unit), radius, faced, tie_break)
    }

    /// Nearest available site to `unit`'s node with no distance limit.
    pub fn nearest_available(&self, unit: UnitIndex, tie_break: TieBreak) -> Option<SiteCandidate> {
        let entry = self.unit(unit)?;
        let faced = &self.thick_filaments()[entry.thick].faced_thin;
        self.available_on(self.node_position(unit), faced)
            .min_by(|a, b| compare(a, b, tie_break))
    }

    fn available_on<'a>(
        &'a self,
        position: f64,
        thin: &'a [usize],
    ) -> impl Iterator<Item = SiteCandidate> + 'a {
        thin.iter()
            .filter_map(move |&f| self.thin_filaments().get(f))
            .flat_map(move |filament| filament.sites.clone())
            .filter_map(move |site| {
                let entry = &self.sites()[site];
                entry.is_available().then(|| SiteCandidate {
                    site,
                    offset: entry.position - position,
                })
            })
    }
}
