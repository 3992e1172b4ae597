use na::{DVector, Vector3};

use crate::{error::Result, spatial::transform::Transform3D, types::Float};

/// Generalized position and velocity of a mechanism, in the joint ordering of
/// the mechanism that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicState {
    pub q: DVector<Float>, // joint configuration vector
    pub v: DVector<Float>, // joint velocity vector
}

impl KinematicState {
    pub fn new(q: DVector<Float>, v: DVector<Float>) -> Self {
        KinematicState { q, v }
    }

    pub fn zeros(nq: usize, nv: usize) -> Self {
        KinematicState {
            q: DVector::zeros(nq),
            v: DVector::zeros(nv),
        }
    }
}

/// Rigid-body geometry services the balance controller relies on.
///
/// Implementations own the kinematic tree. They are queried with arbitrary
/// states, so the controller can evaluate both the measured state and its
/// own virtual target through the same code path.
pub trait Mechanism {
    /// Dimension of the configuration vector
    fn nq(&self) -> usize;

    /// Dimension of the velocity vector
    fn nv(&self) -> usize;

    fn neutral_configuration(&self) -> DVector<Float>;

    /// Index of the actuated joint in q
    fn motor_position_index(&self) -> usize;

    /// Index of the actuated joint in v
    fn motor_velocity_index(&self) -> usize;

    /// Center-of-mass position and velocity, expressed in world frame.
    fn center_of_mass(
        &self,
        q: &DVector<Float>,
        v: &DVector<Float>,
    ) -> Result<(Vector3<Float>, Vector3<Float>)>;

    /// Placement of a named frame, i.e. the transform from that frame to world.
    fn frame_placement(&self, frame: &str, q: &DVector<Float>) -> Result<Transform3D>;

    /// Names of the contact frames, in sensor order.
    fn contact_frames(&self) -> &[String];
}
