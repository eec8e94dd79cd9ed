use sha2::{Digest, Sha256};

use crate::scheme::KineticScheme;

/// Computes the canonical structural hash of a scheme.
pub fn canonical_scheme_hash(scheme: &KineticScheme) -> String {
    let mut hasher = Sha256::new();
    let version = scheme.schema_version();
    hasher.update((version.major as u64).to_le_bytes());
    hasher.update((version.minor as u64).to_le_bytes());
    hasher.update((version.patch as u64).to_le_bytes());
    let params = scheme.params();
    hasher.update(params.max_rate.to_bits().to_le_bytes());
    hasher.update(params.reset_distortion.to_bits().to_le_bytes());
    hasher.update((params.initial_state.as_raw() as u64).to_le_bytes());

    hasher.update((scheme.states().len() as u64).to_le_bytes());
    for state in scheme.states() {
        hasher.update(state.kind.tag());
        hasher.update(state.extension.to_bits().to_le_bytes());
    }
    hasher.update((scheme.transitions().len() as u64).to_le_bytes());
    for transition in scheme.transitions() {
        hasher.update((transition.from.as_raw() as u64).to_le_bytes());
        hasher.update((transition.to.as_raw() as u64).to_le_bytes());
        hasher.update(transition.law.name().as_bytes());
        for value in transition.law.parameters() {
            hasher.update(value.to_bits().to_le_bytes());
        }
    }

    let digest = hasher.finalize();
    digest
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>()
}

impl KineticScheme {
    /// Canonical hash over structure and parameters; labels are excluded.
    pub fn canonical_hash(&self) -> String {
        canonical_scheme_hash(self)
    }
}
