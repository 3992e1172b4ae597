//! Run configuration, loaded from TOML.
//!
//! Every section has defaults matching the reference balancing scenario, so
//! an empty file is a valid configuration. Values are fixed for the whole
//! run; `validate` is called before anything is built from them.

use std::path::Path;

use serde::Deserialize;

use crate::{
    control::{CommandMode, FeedbackMode, GainOverrides, Gains},
    error::{BalanceError, Result},
    integrators::Integrator,
    reference::ReferenceParams,
    sensor::ForceSensorOptions,
    types::Float,
    GRAVITY,
};

/// Tolerance on the low-level / high-level frequency ratio being an integer
const RATE_RATIO_TOLERANCE: Float = 1e-9;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub mass: Float,
    pub length: Float,
    pub gravity: Float,
    pub foot_half_length: Float,
    pub foot_half_width: Float,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            mass: 75.0,
            length: 1.0,
            gravity: GRAVITY,
            foot_half_length: 0.1,
            foot_half_width: 0.1,
        }
    }
}

impl PhysicsConfig {
    /// Natural frequency of the pendulum, sqrt(g / l)
    pub fn omega(&self) -> Float {
        (self.gravity / self.length).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Period of the actuator command update [s]
    pub low_level_period: Float,
    /// Frequency of the DCM correction [Hz]
    pub high_level_frequency: Float,
}

impl Default for RateConfig {
    fn default() -> Self {
        RateConfig {
            low_level_period: 1e-3,
            high_level_frequency: 200.0,
        }
    }
}

impl RateConfig {
    /// Number of low-level ticks per high-level update. Ratios that are not
    /// integers are rejected rather than rounded.
    pub fn ratio(&self) -> Result<usize> {
        let low_level_frequency = 1.0 / self.low_level_period;
        let ratio = low_level_frequency / self.high_level_frequency;
        let rounded = ratio.round();
        if !ratio.is_finite()
            || rounded < 1.0
            || (ratio - rounded).abs() > RATE_RATIO_TOLERANCE * rounded
        {
            return Err(BalanceError::RateRatio {
                low_level_frequency,
                high_level_frequency: self.high_level_frequency,
            });
        }
        Ok(rounded as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClampConfig {
    pub enabled: bool,
    /// The ZMP command is kept in [-bound, bound]
    pub bound: Float,
}

impl Default for ClampConfig {
    fn default() -> Self {
        ClampConfig {
            enabled: false,
            bound: 0.1,
        }
    }
}

/// Constant offset added to the COM/ZMP reference after `time`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PerturbationConfig {
    pub magnitude: Float,
    pub time: Float,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        PerturbationConfig {
            magnitude: 0.02,
            time: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Largest integration step [s]
    pub dt_max: Float,
    pub sensors_update_period: Float,
    pub integrator: Integrator,
    pub seed: u64,
    /// Initial joint angle and velocity
    pub q0: Float,
    pub v0: Float,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            dt_max: 2e-4,
            sensors_update_period: 1e-3,
            integrator: Integrator::RungeKutta4,
            seed: 0,
            q0: 0.0,
            v0: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub physics: PhysicsConfig,
    pub reference: ReferenceParams,
    pub rates: RateConfig,
    pub gains: GainOverrides,
    pub feedback: FeedbackMode,
    pub command: CommandMode,
    pub clamp: ClampConfig,
    pub perturbation: PerturbationConfig,
    pub simulation: SimulationConfig,
    pub sensors: ForceSensorOptions,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        BalanceConfig {
            physics: PhysicsConfig::default(),
            reference: ReferenceParams::default(),
            rates: RateConfig::default(),
            gains: GainOverrides::default(),
            feedback: FeedbackMode::ActualFeedback,
            command: CommandMode::Position,
            clamp: ClampConfig::default(),
            perturbation: PerturbationConfig::default(),
            simulation: SimulationConfig::default(),
            sensors: ForceSensorOptions::default(),
        }
    }
}

impl BalanceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: BalanceConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        BalanceConfig::from_toml_str(&s)
    }

    /// Preset gains of the feedback mode, with the configured overrides applied
    pub fn gains(&self) -> Gains {
        let preset = Gains::preset(self.feedback, self.physics.mass, self.physics.length);
        self.gains.apply(preset)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("physics.mass", self.physics.mass),
            ("physics.length", self.physics.length),
            ("physics.gravity", self.physics.gravity),
            ("physics.foot_half_length", self.physics.foot_half_length),
            ("physics.foot_half_width", self.physics.foot_half_width),
            ("rates.low_level_period", self.rates.low_level_period),
            ("rates.high_level_frequency", self.rates.high_level_frequency),
            ("simulation.dt_max", self.simulation.dt_max),
            (
                "simulation.sensors_update_period",
                self.simulation.sensors_update_period,
            ),
        ];
        for (name, value) in positive {
            if !(value > 0.) {
                return Err(BalanceError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let gains = self.gains();
        if !(0.0..=1.0).contains(&gains.decay) {
            return Err(BalanceError::InvalidConfig(format!(
                "gains.decay must lie in [0, 1], got {}",
                gains.decay
            )));
        }
        if self.clamp.bound < 0. {
            return Err(BalanceError::InvalidConfig(format!(
                "clamp.bound must not be negative, got {}",
                self.clamp.bound
            )));
        }
        if self.reference.duration < 0. {
            return Err(BalanceError::InvalidConfig(format!(
                "reference.duration must not be negative, got {}",
                self.reference.duration
            )));
        }

        self.rates.ratio()?;
        Ok(())
    }
}
