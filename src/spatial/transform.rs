use na::Isometry3;
use nalgebra::{Matrix3, Vector3};

use crate::{spatial::wrench::Wrench, types::Float};

/// A rigid transformation from one 3-dimensional Cartesian coordinate system
/// to another.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform3D {
    pub from: String,
    pub to: String,
    pub iso: Isometry3<Float>,
}

impl Transform3D {
    /// Returns a transformation of translation by (x, y, z)
    pub fn move_xyz(from: &str, to: &str, x: Float, y: Float, z: Float) -> Self {
        Transform3D {
            from: from.to_string(),
            to: to.to_string(),
            iso: Isometry3::translation(x, y, z),
        }
    }

    pub fn rot(&self) -> Matrix3<Float> {
        self.iso.rotation.to_rotation_matrix().matrix().into_owned()
    }

    pub fn trans(&self) -> Vector3<Float> {
        self.iso.translation.vector
    }

    /// Express a wrench given in the `from` frame in the `to` frame.
    ///     f' = R f
    ///     τ' = R τ + p × (R f)
    pub fn act(&self, wrench: &Wrench) -> Wrench {
        if wrench.frame != self.from {
            panic!(
                "wrench frame {} != transform from frame {}",
                wrench.frame, self.from
            );
        }

        let rot = self.rot();
        let linear = rot * wrench.linear;
        let angular = rot * wrench.angular + self.trans().cross(&linear);
        Wrench {
            frame: self.to.clone(),
            angular,
            linear,
        }
    }
}
