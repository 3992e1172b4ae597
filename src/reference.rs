use serde::Deserialize;

use crate::{
    error::{BalanceError, Result},
    types::Float,
};

/// Shape of the COM/ZMP reference: hold still, ramp linearly, then hold at
/// the target offset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReferenceParams {
    /// Length of the run covered by the reference [s]
    pub duration: Float,
    /// Time spent at zero before the ramp starts [s]
    pub stabilization_delay: Float,
    /// Time taken by the ramp to reach the target [s]
    pub ramp_duration: Float,
    /// Final COM/ZMP position along x [m]
    pub target_offset: Float,
}

impl Default for ReferenceParams {
    fn default() -> Self {
        ReferenceParams {
            duration: 2.0,
            stabilization_delay: 0.5,
            ramp_duration: 1.0,
            target_offset: 0.041,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceSample {
    pub position: Float,
    pub velocity: Float,
    pub acceleration: Float,
}

impl ReferenceSample {
    /// The ZMP reference coincides with the COM reference.
    pub fn zmp(&self) -> Float {
        self.position
    }

    pub fn dcm(&self, omega: Float) -> Float {
        self.position + self.velocity / omega
    }
}

/// COM reference sampled at the low-level period, one sample per tick.
#[derive(Debug, Clone)]
pub struct ReferenceTrajectory {
    period: Float,
    position: Vec<Float>,
    velocity: Vec<Float>,
    acceleration: Vec<Float>,
}

impl ReferenceTrajectory {
    pub fn new(params: &ReferenceParams, period: Float) -> Result<Self> {
        if !(period > 0.) {
            return Err(BalanceError::InvalidConfig(format!(
                "reference period must be positive, got {}",
                period
            )));
        }
        if params.duration < 0. || params.stabilization_delay < 0. || params.ramp_duration < 0. {
            return Err(BalanceError::InvalidConfig(
                "reference durations must not be negative".to_string(),
            ));
        }

        let n_samples = (params.duration / period).round() as usize + 1;
        let ramp_start = (params.stabilization_delay / period).round() as usize;
        let ramp_ticks = (params.ramp_duration / period).round() as usize;
        let ramp_end = ramp_start + ramp_ticks;
        let slope = if ramp_ticks > 0 {
            params.target_offset / (ramp_ticks as Float * period)
        } else {
            0.
        };

        let position = (0..n_samples)
            .map(|k| {
                if k < ramp_start {
                    0.
                } else if k < ramp_end {
                    params.target_offset * (k - ramp_start) as Float / ramp_ticks as Float
                } else {
                    params.target_offset
                }
            })
            .collect();
        let velocity = (0..n_samples)
            .map(|k| {
                if k >= ramp_start && k < ramp_end {
                    slope
                } else {
                    0.
                }
            })
            .collect();
        // Piecewise-linear position: acceleration vanishes away from the ramp corners
        let acceleration = vec![0.; n_samples];

        Ok(ReferenceTrajectory {
            period,
            position,
            velocity,
            acceleration,
        })
    }

    pub fn period(&self) -> Float {
        self.period
    }

    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    pub fn sample(&self, index: usize) -> Result<ReferenceSample> {
        if index >= self.len() {
            return Err(BalanceError::ReferenceExhausted {
                index,
                len: self.len(),
            });
        }
        Ok(ReferenceSample {
            position: self.position[index],
            velocity: self.velocity[index],
            acceleration: self.acceleration[index],
        })
    }

    pub fn positions(&self) -> &[Float] {
        &self.position
    }

    pub fn velocities(&self) -> &[Float] {
        &self.velocity
    }

    pub fn accelerations(&self) -> &[Float] {
        &self.acceleration
    }
}
