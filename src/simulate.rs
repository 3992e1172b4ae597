use na::{dvector, DVector};
use tracing::{debug, error, info};

use crate::{
    config::BalanceConfig,
    control::{balance::BalanceController, Controller},
    error::{BalanceError, Result},
    integrators::Integrator,
    mechanism::{KinematicState, Mechanism},
    pendulum::PendulumOnFoot,
    sensor::{ForceSensorSet, SensorFrame},
    telemetry::TelemetryLog,
    types::Float,
};

/// How the driver advances time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepperOptions {
    /// Largest integration step [s]
    pub dt_max: Float,
    /// Low-level tick period of the controller [s]
    pub controller_update_period: Float,
    /// Period between two force sensor samples [s]
    pub sensors_update_period: Float,
    pub integrator: Integrator,
}

impl StepperOptions {
    pub fn from_config(config: &BalanceConfig) -> Self {
        StepperOptions {
            dt_max: config.simulation.dt_max,
            controller_update_period: config.rates.low_level_period,
            sensors_update_period: config.simulation.sensors_update_period,
            integrator: config.simulation.integrator,
        }
    }
}

/// Result of a run: the telemetry log and the plant state after each tick.
pub struct SimulationOutput {
    pub log: TelemetryLog,
    pub qs: Vec<DVector<Float>>,
    pub vs: Vec<DVector<Float>>,
}

impl SimulationOutput {
    pub fn final_state(&self) -> Option<KinematicState> {
        Some(KinematicState::new(
            self.qs.last()?.clone(),
            self.vs.last()?.clone(),
        ))
    }
}

/// Simulate the plant under the controller from 0 to final_time.
///
/// The controller is called once per tick at t = k * controller_update_period.
/// Its command is held over the tick while the plant is integrated with steps
/// no longer than dt_max. Force sensors are refreshed on tick boundaries at
/// their own period, from the contact forces of the latest plant acceleration.
pub fn simulate(
    plant: &PendulumOnFoot,
    initial: &KinematicState,
    controller: &mut dyn Controller,
    sensors: &mut ForceSensorSet,
    options: &StepperOptions,
    final_time: Float,
) -> Result<SimulationOutput> {
    let period = options.controller_update_period;
    if !(period > 0.) || !(options.dt_max > 0.) || !(options.sensors_update_period > 0.) {
        return Err(BalanceError::InvalidConfig(format!(
            "stepper periods must be positive: {:?}",
            options
        )));
    }

    let n_ticks = (final_time / period).round() as usize;
    let n_substeps = (period / options.dt_max).ceil().max(1.) as usize;
    let dt = period / n_substeps as Float;
    let sensors_ratio = ((options.sensors_update_period / period).round() as usize).max(1);
    info!(n_ticks, n_substeps, dt, sensors_ratio, "starting simulation");

    let contacts = plant.contact_frames().to_vec();
    let mut q = initial.q.clone();
    let mut v = initial.v.clone();
    let mut vdot = plant.forward_dynamics(&q, &DVector::zeros(plant.nv()))?;
    let mut frame = SensorFrame::default();

    let mut log = TelemetryLog::new(controller.telemetry());
    let mut qs = vec![q.clone()];
    let mut vs = vec![v.clone()];
    let mut command = dvector![0.];
    let mut effort = DVector::zeros(plant.nv());

    for k in 0..n_ticks {
        let t = k as Float * period;
        if k % sensors_ratio == 0 {
            let forces = plant.contact_forces(&q, &v, &vdot)?;
            frame = sensors.measure(&contacts, &forces)?;
        }

        controller.compute_command(t, &q, &v, &frame, &mut command)?;

        for i in 0..n_substeps {
            let ts = t + i as Float * dt;
            controller.internal_dynamics(ts, &q, &v, &frame, &mut effort)?;
            let mut tau = effort.clone();
            tau[plant.motor_velocity_index()] += command[0];

            let (new_q, new_v) = options
                .integrator
                .step(&q, &v, dt, |q, _v| plant.forward_dynamics(q, &tau))?;
            vdot = plant.forward_dynamics(&new_q, &tau)?;
            q = new_q;
            v = new_v;
            ensure_finite(ts + dt, &q, &v, &tau)?;
        }

        log.sample(t, controller.telemetry());
        qs.push(q.clone());
        vs.push(v.clone());
    }

    debug!(q = ?q.as_slice(), v = ?v.as_slice(), "final plant state");
    info!(samples = log.len(), "simulation finished");
    Ok(SimulationOutput { log, qs, vs })
}

/// Fails when the plant state or the effort applied to it is not finite
fn ensure_finite(
    t: Float,
    q: &DVector<Float>,
    v: &DVector<Float>,
    tau: &DVector<Float>,
) -> Result<()> {
    if q.iter().chain(v.iter()).chain(tau.iter()).all(|x| x.is_finite()) {
        return Ok(());
    }
    error!(t, q = ?q.as_slice(), v = ?v.as_slice(), tau = ?tau.as_slice(), "plant state diverged");
    Err(BalanceError::Mechanism(format!(
        "plant state is not finite at t = {}: q = {:?}, v = {:?}, effort = {:?}",
        t,
        q.as_slice(),
        v.as_slice(),
        tau.as_slice()
    )))
}

/// Build plant, controller and sensors from a configuration and run it until
/// the end of the reference trajectory.
pub fn run_balance(config: &BalanceConfig) -> Result<SimulationOutput> {
    config.validate()?;
    let physics = &config.physics;
    let plant = PendulumOnFoot::new(
        physics.mass,
        physics.length,
        physics.foot_half_length,
        physics.foot_half_width,
    )
    .with_gravity(physics.gravity);

    // The controller carries its own model of the plant
    let mut controller = BalanceController::new(plant.clone(), config)?;
    let mut sensors = ForceSensorSet::for_contacts(
        plant.contact_frames(),
        &config.sensors,
        config.simulation.seed,
    )?;

    let initial = KinematicState::new(dvector![config.simulation.q0], dvector![config.simulation.v0]);
    let options = StepperOptions::from_config(config);
    simulate(
        &plant,
        &initial,
        &mut controller,
        &mut sensors,
        &options,
        config.reference.duration,
    )
}
