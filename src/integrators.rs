use na::DVector;
use serde::Deserialize;

use crate::{error::Result, types::Float};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    SemiImplicitEuler,
    RungeKutta4,
}

impl Integrator {
    /// Advance (q, v) by dt under the acceleration field `vdot(q, v)`.
    pub fn step<F>(
        &self,
        q: &DVector<Float>,
        v: &DVector<Float>,
        dt: Float,
        vdot: F,
    ) -> Result<(DVector<Float>, DVector<Float>)>
    where
        F: FnMut(&DVector<Float>, &DVector<Float>) -> Result<DVector<Float>>,
    {
        match self {
            Integrator::SemiImplicitEuler => semi_implicit_euler(q, v, dt, vdot),
            Integrator::RungeKutta4 => runge_kutta_4(q, v, dt, vdot),
        }
    }
}

/// Semi-Implicit Euler integration step:
///     v(k+1) = v(k) + dt * vdot
///     q(k+1) = q(k) + dt * v(k+1)
///
/// Energy conserving for Hamiltonian systems such as the free pendulum.
pub fn semi_implicit_euler<F>(
    q: &DVector<Float>,
    v: &DVector<Float>,
    dt: Float,
    mut vdot: F,
) -> Result<(DVector<Float>, DVector<Float>)>
where
    F: FnMut(&DVector<Float>, &DVector<Float>) -> Result<DVector<Float>>,
{
    let a = vdot(q, v)?;
    let new_v = v + a * dt;
    let new_q = q + &new_v * dt;
    Ok((new_q, new_v))
}

/// Classic fourth-order Runge-Kutta on the first-order system (q, v)
pub fn runge_kutta_4<F>(
    q: &DVector<Float>,
    v: &DVector<Float>,
    dt: Float,
    mut vdot: F,
) -> Result<(DVector<Float>, DVector<Float>)>
where
    F: FnMut(&DVector<Float>, &DVector<Float>) -> Result<DVector<Float>>,
{
    let k1_q = v.clone();
    let k1_v = vdot(q, v)?;

    let q2 = q + &k1_q * (dt / 2.);
    let v2 = v + &k1_v * (dt / 2.);
    let k2_q = v2.clone();
    let k2_v = vdot(&q2, &v2)?;

    let q3 = q + &k2_q * (dt / 2.);
    let v3 = v + &k2_v * (dt / 2.);
    let k3_q = v3.clone();
    let k3_v = vdot(&q3, &v3)?;

    let q4 = q + &k3_q * dt;
    let v4 = v + &k3_v * dt;
    let k4_q = v4.clone();
    let k4_v = vdot(&q4, &v4)?;

    let new_q = q + (k1_q + k2_q * 2. + k3_q * 2. + k4_q) * (dt / 6.);
    let new_v = v + (k1_v + k2_v * 2. + k3_v * 2. + k4_v) * (dt / 6.);
    Ok((new_q, new_v))
}
