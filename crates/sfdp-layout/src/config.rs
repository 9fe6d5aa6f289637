//! Layout parameters.
//!
//! All tunables of a run live in one immutable [`LayoutParameters`] value.
//! Every field has a serde default so partial JSON documents deserialize.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{LayoutError, Result};

/// Step-size schedule applied after each iteration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoolingSchedule {
    /// Multiply the step by `step_schedule` every iteration.
    Simple,
    /// Grow the step after five consecutive energy improvements, shrink it otherwise.
    #[default]
    Adaptive,
}

/// How computed moves are written back to the position store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Forces are computed in parallel against a snapshot of the positions
    /// and applied together afterwards. Results do not depend on thread count.
    #[default]
    Snapshot,
    /// Vertices are processed in index order and moved immediately, so later
    /// vertices see neighbours that have already moved this iteration.
    InPlace,
}

/// Parameters of a single SFDP run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutParameters {
    /// Repulsion constant `C`.
    #[serde(default = "default_c")]
    pub c: f64,
    /// Ideal edge length `K`.
    #[serde(default = "default_k")]
    pub k: f64,
    /// Repulsion decay exponent `p`.
    #[serde(default = "default_p")]
    pub p: f64,
    /// Barnes-Hut opening threshold. `0` disables the approximation.
    #[serde(default = "default_theta")]
    pub theta: f64,
    /// Step size of the first iteration.
    #[serde(default = "default_init_step")]
    pub init_step: f64,
    /// Step multiplier, `0 < step_schedule < 1`.
    #[serde(default = "default_step_schedule")]
    pub step_schedule: f64,
    /// Quadtree depth.
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    /// Convergence tolerance, relative to `k`.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Iteration cap; `0` means unbounded.
    #[serde(default)]
    pub max_iter: usize,
    #[serde(default)]
    pub cooling: CoolingSchedule,
    #[serde(default)]
    pub update: UpdatePolicy,
}

fn default_c() -> f64 {
    0.2
}

fn default_k() -> f64 {
    1.0
}

fn default_p() -> f64 {
    2.0
}

fn default_theta() -> f64 {
    0.6
}

fn default_init_step() -> f64 {
    1.0
}

fn default_step_schedule() -> f64 {
    0.9
}

fn default_max_level() -> u32 {
    11
}

fn default_epsilon() -> f64 {
    0.01
}

impl Default for LayoutParameters {
    fn default() -> Self {
        Self {
            c: default_c(),
            k: default_k(),
            p: default_p(),
            theta: default_theta(),
            init_step: default_init_step(),
            step_schedule: default_step_schedule(),
            max_level: default_max_level(),
            epsilon: default_epsilon(),
            max_iter: 0,
            cooling: CoolingSchedule::default(),
            update: UpdatePolicy::default(),
        }
    }
}

impl LayoutParameters {
    /// Parse parameters from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read parameters from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn with_ideal_length(mut self, k: f64) -> Self {
        self.k = k;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    pub fn with_update_policy(mut self, update: UpdatePolicy) -> Self {
        self.update = update;
        self
    }

    /// Whether the simple (monotonic) cooling schedule is selected.
    pub fn simple(&self) -> bool {
        self.cooling == CoolingSchedule::Simple
    }

    /// Average displacement below which the run is converged.
    pub fn convergence_threshold(&self) -> f64 {
        self.epsilon * self.k
    }

    /// Check that every parameter is in its meaningful range.
    ///
    /// The layout itself does not call this; out-of-range values there
    /// simply produce non-finite coordinates.
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, reason: impl Into<String>) -> Result<()> {
            Err(LayoutError::InvalidParameter {
                name,
                reason: reason.into(),
            })
        }

        if !self.c.is_finite() {
            return invalid("c", format!("must be finite, got {}", self.c));
        }
        if !(self.k > 0.0 && self.k.is_finite()) {
            return invalid("k", format!("must be positive, got {}", self.k));
        }
        if !self.p.is_finite() {
            return invalid("p", format!("must be finite, got {}", self.p));
        }
        if !(self.theta >= 0.0) {
            return invalid("theta", format!("must be >= 0, got {}", self.theta));
        }
        if !(self.init_step > 0.0) {
            return invalid(
                "init_step",
                format!("must be positive, got {}", self.init_step),
            );
        }
        if !(self.step_schedule > 0.0 && self.step_schedule < 1.0) {
            return invalid(
                "step_schedule",
                format!("must be in (0, 1), got {}", self.step_schedule),
            );
        }
        if !(self.epsilon >= 0.0) {
            return invalid("epsilon", format!("must be >= 0, got {}", self.epsilon));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = LayoutParameters::default();
        assert!(params.validate().is_ok());
        assert!(!params.simple());
        assert_eq!(params.update, UpdatePolicy::Snapshot);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let params =
            LayoutParameters::from_json_str(r#"{"k": 2.5, "cooling": "simple", "max_iter": 40}"#)
                .unwrap();
        assert_eq!(params.k, 2.5);
        assert!(params.simple());
        assert_eq!(params.max_iter, 40);
        assert_eq!(params.theta, 0.6);
        assert_eq!(params.max_level, 11);
    }

    #[test]
    fn test_update_policy_names() {
        let params = LayoutParameters::from_json_str(r#"{"update": "in_place"}"#).unwrap();
        assert_eq!(params.update, UpdatePolicy::InPlace);
    }

    #[test]
    fn test_malformed_json() {
        let err = LayoutParameters::from_json_str("{k: }").unwrap_err();
        assert!(matches!(err, LayoutError::Config(_)));
    }

    #[test]
    fn test_validate_rejects() {
        let bad_k = LayoutParameters::default().with_ideal_length(0.0);
        assert!(matches!(
            bad_k.validate(),
            Err(LayoutError::InvalidParameter { name: "k", .. })
        ));

        let bad_schedule = LayoutParameters {
            step_schedule: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_schedule.validate(),
            Err(LayoutError::InvalidParameter {
                name: "step_schedule",
                ..
            })
        ));

        let bad_theta = LayoutParameters {
            theta: f64::NAN,
            ..Default::default()
        };
        assert!(bad_theta.validate().is_err());
    }

    #[test]
    fn test_convergence_threshold() {
        let params = LayoutParameters {
            epsilon: 0.05,
            k: 4.0,
            ..Default::default()
        };
        assert_eq!(params.convergence_threshold(), 0.2);
    }
}
