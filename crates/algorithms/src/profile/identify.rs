//! Drop and slope feature identification
//!
//! Scans a long profile for steps: places where the bed falls by at least a
//! minimum drop, or at least a minimum grade, over a fixed window of path
//! distance. Looking downstream from each sample finds the crest of a step;
//! looking upstream finds its toe.
//!
//! Every qualifying sample is reported. Consecutive hits on the same step are
//! not merged.

use crate::profile::assemble::ProfileSample;
use reachline_core::{Algorithm, Error, PathAddress, Point3, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which way the window extends from each sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlowDirection {
    /// Towards the outlet; hits mark the crest of a step
    #[default]
    Downstream,
    /// Towards the source; hits mark the toe of a step
    Upstream,
}

/// Parameters for feature identification
#[derive(Debug, Clone, Copy)]
pub struct IdentifyParams {
    pub direction: FlowDirection,
    /// Minimum grade (drop / window); `None` disables the criterion
    pub min_slope: Option<f64>,
    /// Minimum elevation drop over the window; `None` disables the criterion
    pub min_drop: Option<f64>,
    /// Window length in path distance units (default 100.0)
    pub window: f64,
}

impl Default for IdentifyParams {
    fn default() -> Self {
        Self {
            direction: FlowDirection::Downstream,
            min_slope: None,
            min_drop: Some(1.0),
            window: 100.0,
        }
    }
}

/// A candidate drop/slope feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub address: PathAddress,
    pub coord: Point3,
    pub elevation: f64,
    /// Elevation at the upstream end of the window minus the downstream end
    pub drop: f64,
    /// `drop` over the window length actually used, which is shorter than
    /// the configured window near the path ends
    pub slope: f64,
    pub direction: FlowDirection,
}

/// Feature identification algorithm
#[derive(Debug, Clone, Default)]
pub struct IdentifyFeatures;

impl Algorithm for IdentifyFeatures {
    type Input = Vec<ProfileSample>;
    type Output = Vec<Feature>;
    type Params = IdentifyParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "IdentifyFeatures"
    }

    fn description(&self) -> &'static str {
        "Flag profile samples where the elevation drop or grade over a window exceeds a threshold"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        identify_features(&input, params)
    }
}

/// Identify drop/slope features along a profile ordered by path distance.
///
/// Within `window` of the far end of the profile the window is truncated to
/// the distance that remains, and the slope is taken over that shorter run.
/// The sample at the very end has no window and is never emitted. The
/// elevation at the far end of the window is interpolated linearly between
/// the bracketing samples. A sample is emitted when it meets any
/// enabled criterion; with both disabled nothing is emitted.
///
/// # Errors
/// `InvalidParameter` for a non-positive window, NaN thresholds, or samples
/// out of path order.
pub fn identify_features(samples: &[ProfileSample], params: IdentifyParams) -> Result<Vec<Feature>> {
    validate(samples, &params)?;
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let first = samples[0].distance();
    let last = samples[samples.len() - 1].distance();
    let tolerance = 1e-9 * (last - first).abs().max(1.0);
    let w = params.window;

    let mut features = Vec::new();
    for s in samples {
        let d = s.distance();
        // near the path ends the window shrinks to the distance available
        let (upper, lower, run) = match params.direction {
            FlowDirection::Downstream => {
                let end = (d + w).min(last);
                (s.elevation, elevation_at(samples, end), end - d)
            }
            FlowDirection::Upstream => {
                let start = (d - w).max(first);
                (elevation_at(samples, start), s.elevation, d - start)
            }
        };
        if run <= tolerance {
            continue;
        }

        let drop = upper - lower;
        let slope = drop / run;
        let steep = params.min_slope.is_some_and(|m| slope >= m);
        let deep = params.min_drop.is_some_and(|m| drop >= m);
        if steep || deep {
            features.push(Feature {
                address: s.address,
                coord: s.coord,
                elevation: s.elevation,
                drop,
                slope,
                direction: params.direction,
            });
        }
    }

    debug!(
        samples = samples.len(),
        features = features.len(),
        window = w,
        direction = ?params.direction,
        "identified features"
    );
    Ok(features)
}

/// Grade from each sample to the next (rise over run, negative where the
/// bed falls downstream). Coincident samples give a grade of 0.
///
/// # Errors
/// `InvalidParameter` if the samples are out of path order.
pub fn sample_slopes(samples: &[ProfileSample]) -> Result<Vec<f64>> {
    check_order(samples)?;
    Ok(samples
        .windows(2)
        .map(|w| {
            let run = w[1].distance() - w[0].distance();
            if run > 0.0 {
                (w[1].elevation - w[0].elevation) / run
            } else {
                0.0
            }
        })
        .collect())
}

fn validate(samples: &[ProfileSample], params: &IdentifyParams) -> Result<()> {
    if !(params.window > 0.0) || !params.window.is_finite() {
        return Err(Error::invalid_parameter(
            "window",
            params.window,
            "must be a positive distance",
        ));
    }
    if params.min_slope.is_some_and(f64::is_nan) {
        return Err(Error::invalid_parameter("min_slope", f64::NAN, "must be a number"));
    }
    if params.min_drop.is_some_and(f64::is_nan) {
        return Err(Error::invalid_parameter("min_drop", f64::NAN, "must be a number"));
    }
    check_order(samples)
}

fn check_order(samples: &[ProfileSample]) -> Result<()> {
    match samples
        .windows(2)
        .position(|w| !(w[1].distance() >= w[0].distance()))
    {
        Some(i) => Err(Error::invalid_parameter(
            "samples",
            samples[i + 1].distance(),
            format!("path distance decreases after sample {i}"),
        )),
        None => Ok(()),
    }
}

/// Linearly interpolated elevation at path distance `d`, which must lie
/// within the profile.
fn elevation_at(samples: &[ProfileSample], d: f64) -> f64 {
    let i = samples.partition_point(|s| s.distance() < d);
    if i == 0 {
        return samples[0].elevation;
    }
    if i == samples.len() {
        return samples[i - 1].elevation;
    }
    let (a, b) = (&samples[i - 1], &samples[i]);
    let run = b.distance() - a.distance();
    if b.distance() == d || run <= 0.0 {
        return b.elevation;
    }
    let t = (d - a.distance()) / run;
    a.elevation + (b.elevation - a.elevation) * t
}
