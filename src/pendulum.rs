use itertools::izip;
use na::{dvector, vector, DVector, Vector3};

use crate::{
    error::{BalanceError, Result},
    mechanism::Mechanism,
    spatial::transform::Transform3D,
    types::Float,
    GRAVITY, WORLD_FRAME,
};

/// Inverted pendulum standing on a rectangular foot.
///
/// A point mass sits at distance `length` from a single revolute joint whose
/// axis is +y. The joint sits on the sole, and q = 0 is upright. The foot is
/// massless, welded to flat ground, and touches it at four corners, each of
/// which carries a contact frame aligned with world.
///
/// This is the plant used by the simulation driver; the controller only sees
/// it through [`Mechanism`].
#[derive(Debug, Clone)]
pub struct PendulumOnFoot {
    pub mass: Float,
    pub length: Float,
    pub foot_half_length: Float, // along x
    pub foot_half_width: Float,  // along y
    pub gravity: Float,
    corners: Vec<String>,
    corner_positions: Vec<Vector3<Float>>,
}

/// Single-joint value of a generalized vector
fn joint_value(vector: &DVector<Float>, what: &str) -> Result<Float> {
    vector
        .get(0)
        .copied()
        .ok_or_else(|| BalanceError::Mechanism(format!("expected 1 joint {}, got none", what)))
}

impl PendulumOnFoot {
    pub fn new(mass: Float, length: Float, foot_half_length: Float, foot_half_width: Float) -> Self {
        let corners = (1..=4).map(|i| format!("Corner{}", i)).collect();
        let (a, b) = (foot_half_length, foot_half_width);
        let corner_positions = vec![
            vector![a, b, 0.],
            vector![a, -b, 0.],
            vector![-a, -b, 0.],
            vector![-a, b, 0.],
        ];
        PendulumOnFoot {
            mass,
            length,
            foot_half_length,
            foot_half_width,
            gravity: GRAVITY,
            corners,
            corner_positions,
        }
    }

    pub fn with_gravity(mut self, gravity: Float) -> Self {
        self.gravity = gravity;
        self
    }

    /// Joint acceleration under the given joint effort
    ///     m l² q̈ = τ + m g l sin(q)
    pub fn forward_dynamics(
        &self,
        q: &DVector<Float>,
        tau: &DVector<Float>,
    ) -> Result<DVector<Float>> {
        let q = joint_value(q, "position")?;
        let tau = joint_value(tau, "effort")?;
        let m = self.mass;
        let l = self.length;
        Ok(dvector![(tau + m * self.gravity * l * q.sin()) / (m * l * l)])
    }

    /// Center-of-mass acceleration for the given joint state and acceleration
    pub fn com_acceleration(&self, q: Float, v: Float, vdot: Float) -> Vector3<Float> {
        let l = self.length;
        let (s, c) = q.sin_cos();
        vector![l * c * vdot - l * s * v * v, 0., -l * s * vdot - l * c * v * v]
    }

    /// Contact forces seen at each corner, expressed in the corner frames, in
    /// the order of [`Mechanism::contact_frames`].
    ///
    /// The ground wrench needed to sustain the motion is split over the four
    /// corners so that their center of pressure matches the ZMP of the motion.
    /// The weld absorbs whatever moment falls outside the support polygon, and
    /// no force is reported when the required normal force is not positive.
    pub fn contact_forces(
        &self,
        q: &DVector<Float>,
        v: &DVector<Float>,
        vdot: &DVector<Float>,
    ) -> Result<Vec<Vector3<Float>>> {
        let (com, _) = self.center_of_mass(q, v)?;
        let acc = self.com_acceleration(
            joint_value(q, "position")?,
            joint_value(v, "velocity")?,
            joint_value(vdot, "acceleration")?,
        );

        // Ground wrench about world origin: rate of change of momentum minus gravity
        let force = self.mass * (acc + vector![0., 0., self.gravity]);
        let torque = com.cross(&force);
        if force.z <= 0. {
            return Ok(vec![Vector3::zeros(); self.corners.len()]);
        }

        let (a, b) = (self.foot_half_length, self.foot_half_width);
        let px = (-torque.y / force.z).clamp(-a, a);
        let py = (torque.x / force.z).clamp(-b, b);
        let n = self.corner_positions.len() as Float;
        let forces = self
            .corner_positions
            .iter()
            .map(|r| {
                let share = (1. + r.x * px / (a * a)) * (1. + r.y * py / (b * b)) / n;
                vector![force.x / n, force.y / n, force.z * share]
            })
            .collect();
        Ok(forces)
    }
}

impl Mechanism for PendulumOnFoot {
    fn nq(&self) -> usize {
        1
    }

    fn nv(&self) -> usize {
        1
    }

    fn neutral_configuration(&self) -> DVector<Float> {
        dvector![0.]
    }

    fn motor_position_index(&self) -> usize {
        0
    }

    fn motor_velocity_index(&self) -> usize {
        0
    }

    fn center_of_mass(
        &self,
        q: &DVector<Float>,
        v: &DVector<Float>,
    ) -> Result<(Vector3<Float>, Vector3<Float>)> {
        let q = joint_value(q, "position")?;
        let v = joint_value(v, "velocity")?;
        let l = self.length;
        let (s, c) = q.sin_cos();
        let com = vector![l * s, 0., l * c];
        let vcom = vector![l * c * v, 0., -l * s * v];
        Ok((com, vcom))
    }

    fn frame_placement(&self, frame: &str, _q: &DVector<Float>) -> Result<Transform3D> {
        for (name, position) in izip!(self.corners.iter(), self.corner_positions.iter()) {
            if name == frame {
                return Ok(Transform3D::move_xyz(
                    name,
                    WORLD_FRAME,
                    position.x,
                    position.y,
                    position.z,
                ));
            }
        }
        Err(BalanceError::UnknownFrame(frame.to_string()))
    }

    fn contact_frames(&self) -> &[String] {
        &self.corners
    }
}
