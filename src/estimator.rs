use na::{Vector2, Vector3};
use tracing::trace;

use crate::{
    error::Result,
    mechanism::{KinematicState, Mechanism},
    sensor::SensorFrame,
    spatial::wrench::Wrench,
    types::Float,
    WORLD_FRAME,
};

/// Balance-related quantities of one kinematic state.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceState {
    pub com: Vector3<Float>,
    pub vcom: Vector3<Float>,
    /// Divergent component of motion, com + vcom / ω
    pub dcm: Vector3<Float>,
    /// Total contact wrench, expressed in world frame
    pub wrench: Wrench,
    pub zmp: Vector2<Float>,
}

/// Estimates COM, DCM and ZMP from a kinematic state and the contact force
/// sensors. Holds no state: the same inputs always give the same output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEstimator {
    omega: Float,
}

impl StateEstimator {
    /// `omega` is the natural frequency of the pendulum, sqrt(g / l)
    pub fn new(omega: Float) -> Self {
        StateEstimator { omega }
    }

    pub fn omega(&self) -> Float {
        self.omega
    }

    /// Estimate the balance state. When the contacts carry no positive normal
    /// force the ZMP is undefined and `prior_zmp` is returned in its place.
    pub fn estimate<M: Mechanism + ?Sized>(
        &self,
        mechanism: &M,
        state: &KinematicState,
        sensors: &SensorFrame,
        prior_zmp: &Vector2<Float>,
    ) -> Result<BalanceState> {
        let (com, vcom) = mechanism.center_of_mass(&state.q, &state.v)?;
        let dcm = com + vcom / self.omega;

        let wrench = total_contact_wrench(mechanism, state, sensors)?;
        let zmp = zmp_from_wrench(&wrench).unwrap_or_else(|| {
            trace!(fz = wrench.linear.z, "no normal contact force, holding ZMP");
            *prior_zmp
        });

        Ok(BalanceState {
            com,
            vcom,
            dcm,
            wrench,
            zmp,
        })
    }
}

/// Sum of the contact forces, each moved from its contact frame to world.
///
/// Only the normal component of each reading is used; lateral forces and
/// torques at the contacts are ignored, the moment comes from the lever arms.
pub fn total_contact_wrench<M: Mechanism + ?Sized>(
    mechanism: &M,
    state: &KinematicState,
    sensors: &SensorFrame,
) -> Result<Wrench> {
    let mut total = Wrench::zero(WORLD_FRAME);
    for contact in mechanism.contact_frames() {
        let placement = mechanism.frame_placement(contact, &state.q)?;
        let normal_force = sensors.force(contact)?.z;
        let wrench = Wrench::from_force(
            &Vector3::zeros(),
            &Vector3::new(0., 0., normal_force),
            contact,
        );
        total += placement.act(&wrench);
    }
    Ok(total)
}

/// ZMP of a ground wrench, or None when its normal force is not positive
pub fn zmp_from_wrench(wrench: &Wrench) -> Option<Vector2<Float>> {
    let fz = wrench.linear.z;
    if !(fz > 0.) {
        return None;
    }
    Some(Vector2::new(-wrench.angular.y / fz, wrench.angular.x / fz))
}
