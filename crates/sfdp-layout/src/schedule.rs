//! Step-size (cooling) schedule.

use tracing::debug;

use crate::{CoolingSchedule, LayoutParameters};

/// Consecutive energy improvements needed before the adaptive schedule grows the step.
const IMPROVEMENT_STREAK: usize = 5;

/// Tracks the step size across iterations.
#[derive(Debug, Clone)]
pub struct StepSchedule {
    cooling: CoolingSchedule,
    factor: f64,
    step: f64,
    progress: usize,
    previous_energy: Option<f64>,
}

impl StepSchedule {
    pub fn new(params: &LayoutParameters) -> Self {
        Self {
            cooling: params.cooling,
            factor: params.step_schedule,
            step: params.init_step,
            progress: 0,
            previous_energy: None,
        }
    }

    /// Step size for the next iteration.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Current run of consecutive energy improvements.
    pub fn progress(&self) -> usize {
        self.progress
    }

    /// Feed the total energy of the iteration that just finished and
    /// return the step size for the next one.
    ///
    /// The first iteration has nothing to compare against and counts as no
    /// improvement.
    pub fn update(&mut self, energy: f64) -> f64 {
        let previous = self.previous_energy.replace(energy);

        match self.cooling {
            CoolingSchedule::Simple => {
                self.step *= self.factor;
            }
            CoolingSchedule::Adaptive => {
                let improved = previous.is_some_and(|e0| energy < e0);
                if improved {
                    self.progress += 1;
                    if self.progress >= IMPROVEMENT_STREAK {
                        self.progress = 0;
                        self.step /= self.factor;
                        debug!(step = self.step, "sfdp_step_grow");
                    }
                } else {
                    self.progress = 0;
                    self.step *= self.factor;
                    debug!(step = self.step, "sfdp_step_shrink");
                }
            }
        }

        self.step
    }
}
