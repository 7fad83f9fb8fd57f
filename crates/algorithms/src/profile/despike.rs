//! Up-spike removal
//!
//! Surface models sampled along a channel pick up bridges, culverts and
//! vegetation as short runs of samples sitting well above the bed. Walking
//! downstream, the bed elevation should not rise, so a run that climbs more
//! than a threshold above the lowest elevation seen so far and then comes
//! back down is an artifact.

use crate::profile::assemble::ProfileSample;
use reachline_core::{Algorithm, Error, Result};
use tracing::debug;

/// Parameters for despiking
#[derive(Debug, Clone, Copy)]
pub struct DespikeParams {
    /// Rise above the running minimum that opens a spike (default 0.0)
    pub threshold: f64,
}

impl Default for DespikeParams {
    fn default() -> Self {
        Self { threshold: 0.0 }
    }
}

/// Despike algorithm
#[derive(Debug, Clone, Default)]
pub struct Despike;

impl Algorithm for Despike {
    type Input = Vec<ProfileSample>;
    type Output = Vec<ProfileSample>;
    type Params = DespikeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Despike"
    }

    fn description(&self) -> &'static str {
        "Remove runs of profile samples that rise above the running minimum elevation and fall back"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        despike(&input, params.threshold)
    }
}

/// Flag spike samples; `true` marks a sample to exclude.
///
/// Single forward pass. A sample more than `threshold` above the running
/// minimum of kept samples joins a pending run. When a later sample comes
/// back within `threshold` of the minimum, the pending run is flagged.
/// A run still pending at the end is kept.
///
/// # Errors
/// `InvalidParameter` if `threshold` is negative or NaN.
pub fn spike_mask(samples: &[ProfileSample], threshold: f64) -> Result<Vec<bool>> {
    if !(threshold >= 0.0) {
        return Err(Error::invalid_parameter(
            "threshold",
            threshold,
            "must be non-negative",
        ));
    }

    let mut mask = vec![false; samples.len()];
    let mut running_min = f64::INFINITY;
    let mut pending: Vec<usize> = Vec::new();

    for (i, s) in samples.iter().enumerate() {
        let z = s.elevation;
        if z > running_min + threshold {
            pending.push(i);
            continue;
        }
        for &j in &pending {
            mask[j] = true;
        }
        pending.clear();
        running_min = running_min.min(z);
    }

    Ok(mask)
}

/// Remove up-spikes, preserving the order of the remaining samples.
///
/// Running it again on its own output changes nothing.
pub fn despike(samples: &[ProfileSample], threshold: f64) -> Result<Vec<ProfileSample>> {
    let mask = spike_mask(samples, threshold)?;
    let kept: Vec<ProfileSample> = samples
        .iter()
        .zip(&mask)
        .filter(|(_, &spike)| !spike)
        .map(|(s, _)| *s)
        .collect();

    debug!(
        samples = samples.len(),
        removed = samples.len() - kept.len(),
        threshold,
        "despiked profile"
    );
    Ok(kept)
}
