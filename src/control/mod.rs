use na::DVector;
use serde::Deserialize;

use crate::{
    error::{BalanceError, Result},
    sensor::SensorFrame,
    telemetry::TelemetryRecorder,
    types::Float,
};

pub mod balance;

/// Hooks a simulation driver calls on its controller.
pub trait Controller {
    /// Called once per low-level tick. Writes the actuator command.
    fn compute_command(
        &mut self,
        t: Float,
        q: &DVector<Float>,
        v: &DVector<Float>,
        sensors: &SensorFrame,
        command: &mut DVector<Float>,
    ) -> Result<()>;

    /// Effort applied to every degree of freedom on top of the actuator
    /// command, evaluated at every integration step.
    fn internal_dynamics(
        &mut self,
        t: Float,
        q: &DVector<Float>,
        v: &DVector<Float>,
        sensors: &SensorFrame,
        effort: &mut DVector<Float>,
    ) -> Result<()>;

    /// Channels the driver samples between ticks
    fn telemetry(&self) -> &TelemetryRecorder;
}

/// Which state the slow-rate DCM correction closes the loop on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackMode {
    /// ZMP and DCM of the controller's virtual target
    TargetFeedback,
    /// Measured ZMP, DCM from measured COM and target COM velocity
    MixedFeedback,
    /// Measured ZMP and DCM
    ActualFeedback,
}

impl FeedbackMode {
    /// Resolve the command-line style flags. Without any flag the measured
    /// state is used.
    pub fn from_flags(targets_fb: bool, mixed_fb: bool) -> Result<Self> {
        match (targets_fb, mixed_fb) {
            (true, true) => Err(BalanceError::ConflictingFeedback),
            (true, false) => Ok(FeedbackMode::TargetFeedback),
            (false, true) => Ok(FeedbackMode::MixedFeedback),
            (false, false) => Ok(FeedbackMode::ActualFeedback),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandMode {
    /// Joint torque from inverse dynamics, refreshed at the slow rate
    Torque,
    /// PD tracking of the integrated virtual target, every tick
    Position,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    /// Joint position tracking
    pub kp: Float,
    pub kd: Float,
    /// DCM feedback
    pub kp_dcm: Float,
    pub kd_dcm: Float,
    pub ki_dcm: Float,
    /// Forgetting factor of the DCM error integral, in [0, 1]
    pub decay: Float,
    /// ZMP-to-COM-acceleration admittance
    pub admittance: Float,
}

impl Gains {
    /// Gains tuned for each feedback mode, for a pendulum of mass m and length l.
    ///
    /// The joint PD has a damping ratio of about 0.6: the plant stands on
    /// rigid contacts, which dissipate nothing on their own.
    pub fn preset(mode: FeedbackMode, mass: Float, length: Float) -> Self {
        let inertia = mass * length * length;
        let kp = inertia * 1e3;
        let kd = inertia * 40.;
        let (kp_dcm, kd_dcm, ki_dcm, decay, admittance) = match mode {
            FeedbackMode::TargetFeedback => (15.0, 2.0, 1.0, 0.1, 15.0),
            FeedbackMode::MixedFeedback => (15.0, 1.0, 0.0, 0.0, 7.5),
            FeedbackMode::ActualFeedback => (1.0, 0.0, 0.5, 0.01, 60.0),
        };
        Gains {
            kp,
            kd,
            kp_dcm,
            kd_dcm,
            ki_dcm,
            decay,
            admittance,
        }
    }
}

/// Gains given in a config file, each replacing the preset value when set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GainOverrides {
    pub kp: Option<Float>,
    pub kd: Option<Float>,
    pub kp_dcm: Option<Float>,
    pub kd_dcm: Option<Float>,
    pub ki_dcm: Option<Float>,
    pub decay: Option<Float>,
    pub admittance: Option<Float>,
}

impl GainOverrides {
    pub fn apply(&self, preset: Gains) -> Gains {
        Gains {
            kp: self.kp.unwrap_or(preset.kp),
            kd: self.kd.unwrap_or(preset.kd),
            kp_dcm: self.kp_dcm.unwrap_or(preset.kp_dcm),
            kd_dcm: self.kd_dcm.unwrap_or(preset.kd_dcm),
            ki_dcm: self.ki_dcm.unwrap_or(preset.ki_dcm),
            decay: self.decay.unwrap_or(preset.decay),
            admittance: self.admittance.unwrap_or(preset.admittance),
        }
    }
}

/// Joint PD command tracking a target state
///     u = -(Kp (q - q_target) + Kd (v - v_target))
pub fn pd_command(q: Float, v: Float, q_target: Float, v_target: Float, kp: Float, kd: Float) -> Float {
    -(kp * (q - q_target) + kd * (v - v_target))
}

/// Joint acceleration of a rigid arm of length l whose tip must accelerate
/// horizontally at ax:
///     x = l sin(q)  =>  q̈ = ẍ / (l cos(q)) + q̇² tan(q)
///
/// Singular at q = ±π/2, which lies outside the balancing envelope and is
/// not checked.
pub fn joint_acceleration(ax: Float, q: Float, v: Float, length: Float) -> Float {
    ax / (length * q.cos()) + v * v * q.tan()
}

/// Torque that gives the pendulum joint acceleration vdot
///     u = m l² (q̈ - g sin(q) / l)
pub fn pendulum_inverse_dynamics(
    vdot: Float,
    q: Float,
    mass: Float,
    length: Float,
    gravity: Float,
) -> Float {
    mass * length * length * (vdot - gravity * q.sin() / length)
}
