//! DCM/ZMP balance controller for a single-actuator inverted pendulum.
//!
//! Every low-level tick the controller estimates COM, DCM and ZMP for both
//! the measured state and its own virtual target, and publishes them. Every
//! `rate_ratio` ticks it also recomputes a ZMP command from the DCM error
//! and turns it into a joint acceleration through an admittance law. The
//! command sent to the actuator is either the matching inverse-dynamics
//! torque, or a PD tracking the virtual target integrated from that
//! acceleration.
//!
//! Reference: "Bipedal walking control based on Capture Point dynamics" by
//! Englsberger et al., 2011

use na::{DVector, Vector2, Vector3};
use tracing::{debug, info};

use crate::{
    config::BalanceConfig,
    control::{
        joint_acceleration, pd_command, pendulum_inverse_dynamics, CommandMode, Controller,
        FeedbackMode, Gains,
    },
    error::Result,
    estimator::{BalanceState, StateEstimator},
    mechanism::{KinematicState, Mechanism},
    reference::{ReferenceSample, ReferenceTrajectory},
    sensor::SensorFrame,
    telemetry::{planar_names, spatial_names, Channels, TelemetryRecorder},
    types::Float,
};

pub const TELEMETRY_NAMESPACE: &str = "HighLevelController";

/// Slack on t / period when locating the current tick
const TICK_EPSILON: Float = 1e-9;

/// Index of the low-level tick at time t
pub fn tick_index(t: Float, period: Float) -> usize {
    (t / period + TICK_EPSILON).floor().max(0.) as usize
}

/// The controller's own joint trajectory. It only moves through the
/// controller's integration, never from measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualTarget {
    pub state: KinematicState,
    pub acceleration: DVector<Float>,
}

struct BalanceChannels {
    target_state: Channels<2>,
    zmp_cmd: Channels<1>,
    zmp: Channels<2>,
    dcm: Channels<3>,
    com: Channels<3>,
    vcom: Channels<3>,
    zmp_target: Channels<2>,
    dcm_target: Channels<3>,
    com_target: Channels<3>,
    vcom_target: Channels<3>,
    wrench_torque: Channels<3>,
    wrench_force: Channels<3>,
    dcm_reference: Channels<3>,
    com_reference: Channels<3>,
    vcom_reference: Channels<3>,
    zmp_reference: Channels<2>,
}

impl BalanceChannels {
    fn register(
        telemetry: &mut TelemetryRecorder,
        com: &Vector3<Float>,
        vcom: &Vector3<Float>,
        dcm: &Vector3<Float>,
        zmp: &Vector2<Float>,
    ) -> Result<Self> {
        let com: [Float; 3] = (*com).into();
        let vcom: [Float; 3] = (*vcom).into();
        let dcm: [Float; 3] = (*dcm).into();
        let zmp: [Float; 2] = (*zmp).into();
        Ok(BalanceChannels {
            target_state: telemetry.register(["targetPositionX", "targetVelocityX"], [0.; 2])?,
            zmp_cmd: telemetry.register(["zmpCmdX"], [zmp[0]])?,
            zmp: telemetry.register(planar_names("zmp"), zmp)?,
            dcm: telemetry.register(spatial_names("dcm"), dcm)?,
            com: telemetry.register(spatial_names("com"), com)?,
            vcom: telemetry.register(spatial_names("vcom"), vcom)?,
            zmp_target: telemetry.register(planar_names("zmpTarget"), zmp)?,
            dcm_target: telemetry.register(spatial_names("dcmTarget"), dcm)?,
            com_target: telemetry.register(spatial_names("comTarget"), com)?,
            vcom_target: telemetry.register(spatial_names("vcomTarget"), vcom)?,
            wrench_torque: telemetry.register(spatial_names("wrenchTorque"), [0.; 3])?,
            wrench_force: telemetry.register(spatial_names("wrenchForce"), [0.; 3])?,
            dcm_reference: telemetry.register(spatial_names("dcmReference"), dcm)?,
            com_reference: telemetry.register(spatial_names("comReference"), com)?,
            vcom_reference: telemetry.register(spatial_names("vcomReference"), vcom)?,
            zmp_reference: telemetry.register(planar_names("zmpReference"), zmp)?,
        })
    }
}

/// Reference of the current tick, with the perturbation applied
#[derive(Debug, Clone, Copy)]
struct TickReference {
    com: Float,
    vcom: Float,
    acom: Float,
    dcm: Float,
    zmp: Float,
}

pub struct BalanceController<M: Mechanism> {
    mechanism: M,
    estimator: StateEstimator,
    reference: ReferenceTrajectory,
    gains: Gains,
    feedback: FeedbackMode,
    command_mode: CommandMode,
    clamp: Option<Float>,
    perturbation_magnitude: Float,
    perturbation_time: Float,
    mass: Float,
    length: Float,
    gravity: Float,
    period: Float,
    rate_ratio: usize,

    target: VirtualTarget,
    integral: Float,
    t_last_correction: Float,
    torque: Float,
    zmp_cmd: Float,
    zmp: Vector2<Float>,
    zmp_target: Vector2<Float>,
    corrections: usize,

    telemetry: TelemetryRecorder,
    channels: BalanceChannels,
}

impl<M: Mechanism> BalanceController<M> {
    /// Build the controller for a mechanism. The mechanism is the controller's
    /// own kinematic model; it is only ever queried, never stepped.
    pub fn new(mechanism: M, config: &BalanceConfig) -> Result<Self> {
        config.validate()?;
        let rate_ratio = config.rates.ratio()?;
        let period = config.rates.low_level_period;
        let reference = ReferenceTrajectory::new(&config.reference, period)?;
        let estimator = StateEstimator::new(config.physics.omega());

        let target = VirtualTarget {
            state: KinematicState::new(
                mechanism.neutral_configuration(),
                DVector::zeros(mechanism.nv()),
            ),
            acceleration: DVector::zeros(mechanism.nv()),
        };
        let (com, vcom) = mechanism.center_of_mass(&target.state.q, &target.state.v)?;
        let dcm = com + vcom / estimator.omega();
        let zmp = Vector2::new(reference.sample(0)?.zmp(), 0.);

        let mut telemetry = TelemetryRecorder::with_namespace(TELEMETRY_NAMESPACE);
        let channels = BalanceChannels::register(&mut telemetry, &com, &vcom, &dcm, &zmp)?;

        let gains = config.gains();
        info!(
            feedback = ?config.feedback,
            command = ?config.command,
            rate_ratio,
            ?gains,
            "balance controller ready"
        );

        Ok(BalanceController {
            mechanism,
            estimator,
            reference,
            gains,
            feedback: config.feedback,
            command_mode: config.command,
            clamp: config.clamp.enabled.then_some(config.clamp.bound),
            perturbation_magnitude: config.perturbation.magnitude,
            perturbation_time: config.perturbation.time,
            mass: config.physics.mass,
            length: config.physics.length,
            gravity: config.physics.gravity,
            period,
            rate_ratio,
            target,
            integral: 0.,
            t_last_correction: 0.,
            torque: 0.,
            zmp_cmd: zmp.x,
            zmp,
            zmp_target: zmp,
            corrections: 0,
            telemetry,
            channels,
        })
    }

    pub fn target(&self) -> &VirtualTarget {
        &self.target
    }

    pub fn integral(&self) -> Float {
        self.integral
    }

    pub fn zmp_command(&self) -> Float {
        self.zmp_cmd
    }

    pub fn rate_ratio(&self) -> usize {
        self.rate_ratio
    }

    /// Number of slow-rate corrections run so far
    pub fn corrections(&self) -> usize {
        self.corrections
    }

    fn tick_reference(&self, t: Float, sample: &ReferenceSample) -> TickReference {
        let perturbation = if t > self.perturbation_time {
            self.perturbation_magnitude
        } else {
            0.
        };
        TickReference {
            com: sample.position + perturbation,
            vcom: sample.velocity,
            acom: sample.acceleration,
            dcm: sample.dcm(self.estimator.omega()) + perturbation,
            zmp: sample.zmp() + perturbation,
        }
    }

    fn publish_estimates(
        &mut self,
        actual: &BalanceState,
        target: &BalanceState,
        reference: &TickReference,
    ) {
        let c = &self.channels;
        let telemetry = &mut self.telemetry;
        telemetry.write(&c.dcm, actual.dcm.into());
        telemetry.write(&c.zmp, actual.zmp.into());
        telemetry.write(&c.com, actual.com.into());
        telemetry.write(&c.vcom, actual.vcom.into());
        telemetry.write(&c.dcm_reference, [reference.dcm, 0., 0.]);
        telemetry.write(&c.zmp_reference, [reference.zmp, 0.]);
        telemetry.write(&c.com_reference, [reference.com, 0., 0.]);
        telemetry.write(&c.vcom_reference, [reference.vcom, 0., 0.]);
        telemetry.write(&c.dcm_target, target.dcm.into());
        telemetry.write(&c.zmp_target, target.zmp.into());
        telemetry.write(&c.com_target, target.com.into());
        telemetry.write(&c.vcom_target, target.vcom.into());
        telemetry.write(&c.wrench_torque, actual.wrench.angular.into());
        telemetry.write(&c.wrench_force, actual.wrench.linear.into());
    }

    /// Slow-rate step: DCM feedback to a ZMP command, admittance to a COM
    /// acceleration, then to the joint acceleration of the virtual target.
    fn correct(
        &mut self,
        t: Float,
        q: Float,
        v: Float,
        actual: &BalanceState,
        target: &BalanceState,
        reference: &TickReference,
    ) {
        let omega = self.estimator.omega();
        let (zmp_fb, dcm_fb) = match self.feedback {
            FeedbackMode::TargetFeedback => (target.zmp.x, target.dcm.x),
            FeedbackMode::MixedFeedback => (actual.zmp.x, actual.com.x + target.vcom.x / omega),
            FeedbackMode::ActualFeedback => (actual.zmp.x, actual.dcm.x),
        };

        let dcm_error = reference.dcm - dcm_fb;
        self.integral =
            (1. - self.gains.decay) * self.integral + (t - self.t_last_correction) * dcm_error;
        self.t_last_correction = t;

        let g = &self.gains;
        let mut zmp_cmd = reference.zmp - (1. + g.kp_dcm / omega) * dcm_error
            + (g.kd_dcm / omega) * (reference.zmp - zmp_fb)
            - (g.ki_dcm / omega) * self.integral;
        if let Some(bound) = self.clamp {
            zmp_cmd = zmp_cmd.clamp(-bound, bound);
        }
        self.zmp_cmd = zmp_cmd;

        // ZMP -> COM admittance, then COM acceleration -> joint acceleration
        let ax = reference.acom + g.admittance * (zmp_fb - zmp_cmd);
        let vdot = joint_acceleration(ax, q, v, self.length);
        let iv = self.mechanism.motor_velocity_index();
        self.target.acceleration[iv] = vdot;

        if self.command_mode == CommandMode::Torque {
            self.torque = pendulum_inverse_dynamics(vdot, q, self.mass, self.length, self.gravity);
        }

        self.corrections += 1;
        debug!(t, dcm_error, zmp_cmd, ax, vdot, integral = self.integral, "dcm correction");
    }
}

impl<M: Mechanism> Controller for BalanceController<M> {
    fn compute_command(
        &mut self,
        t: Float,
        q: &DVector<Float>,
        v: &DVector<Float>,
        sensors: &SensorFrame,
        command: &mut DVector<Float>,
    ) -> Result<()> {
        let tick = tick_index(t, self.period);
        let sample = self.reference.sample(tick + 1)?;
        let reference = self.tick_reference(t, &sample);

        // Same estimator for the measured state and the virtual target
        let measured = KinematicState::new(q.clone(), v.clone());
        let actual = self
            .estimator
            .estimate(&self.mechanism, &measured, sensors, &self.zmp)?;
        let target = self.estimator.estimate(
            &self.mechanism,
            &self.target.state,
            sensors,
            &self.zmp_target,
        )?;
        self.zmp = actual.zmp;
        self.zmp_target = target.zmp;
        self.publish_estimates(&actual, &target, &reference);

        let ip = self.mechanism.motor_position_index();
        let iv = self.mechanism.motor_velocity_index();
        if tick % self.rate_ratio == 0 {
            self.correct(t, q[ip], v[iv], &actual, &target, &reference);
        }

        match self.command_mode {
            CommandMode::Torque => {
                command[0] = self.torque;
            }
            CommandMode::Position => {
                // Semi-implicit Euler on the virtual target
                let state = &mut self.target.state;
                state.v[iv] += self.target.acceleration[iv] * self.period;
                state.q[ip] += state.v[iv] * self.period;
                command[0] = pd_command(
                    q[ip],
                    v[iv],
                    state.q[ip],
                    state.v[iv],
                    self.gains.kp,
                    self.gains.kd,
                );
            }
        }

        let target_state = [self.target.state.q[ip], self.target.state.v[iv]];
        self.telemetry.write(&self.channels.zmp_cmd, [self.zmp_cmd]);
        self.telemetry.write(&self.channels.target_state, target_state);
        Ok(())
    }

    fn internal_dynamics(
        &mut self,
        _t: Float,
        _q: &DVector<Float>,
        _v: &DVector<Float>,
        _sensors: &SensorFrame,
        effort: &mut DVector<Float>,
    ) -> Result<()> {
        effort.fill(0.);
        Ok(())
    }

    fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }
}

#[cfg(test)]
mod balance_tests {
    use std::ops::Range;

    use na::{dvector, vector, Vector3};

    use crate::{
        assert_close,
        control::GainOverrides,
        error::BalanceError,
        sensor::ForceReading,
        spatial::transform::Transform3D,
        GRAVITY, WORLD_FRAME,
    };

    use super::*;

    /// COM at (q, 0, 1) moving at (v, 0, 0), without contacts. The ZMP is
    /// never observed, so it stays at its initial value.
    struct SlidingMass;

    impl Mechanism for SlidingMass {
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
            Ok((Vector3::new(q[0], 0., 1.), Vector3::new(v[0], 0., 0.)))
        }

        fn frame_placement(&self, frame: &str, _q: &DVector<Float>) -> Result<Transform3D> {
            Err(BalanceError::UnknownFrame(frame.to_string()))
        }

        fn contact_frames(&self) -> &[String] {
            &[]
        }
    }

    fn config(command: CommandMode, gains: GainOverrides) -> BalanceConfig {
        BalanceConfig {
            command,
            gains,
            ..BalanceConfig::default()
        }
    }

    /// Run a range of ticks with the plant frozen at (q, v), returning the last command
    fn run(
        controller: &mut BalanceController<SlidingMass>,
        ticks: Range<usize>,
        q: Float,
        v: Float,
    ) -> Float {
        let period = 1e-3;
        let sensors = SensorFrame::new(vec![]);
        let (q, v) = (dvector![q], dvector![v]);
        let mut command = dvector![0.];
        for k in ticks {
            controller
                .compute_command(k as Float * period, &q, &v, &sensors, &mut command)
                .unwrap();
        }
        command[0]
    }

    #[test]
    fn tick_index_absorbs_rounding() {
        assert_eq!(tick_index(0., 1e-3), 0);
        assert_eq!(tick_index(3. * 1e-3, 1e-3), 3);
        assert_eq!(tick_index(0.0049999, 1e-3), 4);
        assert_eq!(tick_index(1.005, 1e-3), 1005);
    }

    #[test]
    fn correction_runs_on_multiples_of_the_rate_ratio() {
        let mut controller =
            BalanceController::new(SlidingMass, &config(CommandMode::Torque, GainOverrides::default()))
                .unwrap();
        let ratio = controller.rate_ratio();
        assert_eq!(ratio, 5);

        let sensors = SensorFrame::new(vec![]);
        let mut command = dvector![0.];
        let mut ticks_with_correction = vec![];
        for k in 0..1000 {
            let before = controller.corrections();
            controller
                .compute_command(k as Float * 1e-3, &dvector![0.01], &dvector![0.], &sensors, &mut command)
                .unwrap();
            if controller.corrections() > before {
                ticks_with_correction.push(k);
            }
        }

        assert_eq!(controller.corrections(), 1000 / ratio);
        let expected: Vec<usize> = (0..1000).step_by(ratio).collect();
        assert_eq!(ticks_with_correction, expected);
    }

    #[test]
    fn integral_without_decay_is_the_discrete_integral() {
        // Reference is zero before the ramp, so the DCM error is -q
        let gains = GainOverrides {
            decay: Some(0.),
            ..GainOverrides::default()
        };
        let mut controller =
            BalanceController::new(SlidingMass, &config(CommandMode::Torque, gains)).unwrap();

        run(&mut controller, 0..21, 0.01, 0.);

        // Corrections at ticks 0, 5, 10, 15, 20; the first one has dt = 0
        assert_eq!(controller.corrections(), 5);
        assert_close!(controller.integral(), 4. * 0.005 * -0.01, 1e-12);
    }

    #[test]
    fn integral_with_full_decay_keeps_the_latest_term() {
        let gains = GainOverrides {
            decay: Some(1.),
            ..GainOverrides::default()
        };
        let mut controller =
            BalanceController::new(SlidingMass, &config(CommandMode::Torque, gains)).unwrap();

        run(&mut controller, 0..21, 0.01, 0.);

        assert_close!(controller.integral(), 0.005 * -0.01, 1e-12);
    }

    #[test]
    fn torque_is_held_between_corrections() {
        let mut controller =
            BalanceController::new(SlidingMass, &config(CommandMode::Torque, GainOverrides::default()))
                .unwrap();

        let first = run(&mut controller, 0..1, 0.01, 0.);
        let held = run(&mut controller, 1..5, 0.01, 0.);

        assert!(first != 0.);
        assert_eq!(first, held);
    }

    #[test]
    fn position_mode_at_rest_commands_nothing() {
        let gains = GainOverrides {
            kd: Some(3000.),
            ..GainOverrides::default()
        };
        let mut controller =
            BalanceController::new(SlidingMass, &config(CommandMode::Position, gains)).unwrap();

        let u = run(&mut controller, 0..100, 0., 0.);

        assert_eq!(u, 0.);
        assert_eq!(controller.target().state.q[0], 0.);
        assert_eq!(controller.zmp_command(), 0.);
    }

    #[test]
    fn position_mode_emits_pd_on_the_virtual_target() {
        for (kp, kd) in [(75e3, 0.), (2000., 300.), (10., 1.)] {
            let gains = GainOverrides {
                kp: Some(kp),
                kd: Some(kd),
                ..GainOverrides::default()
            };
            let mut controller =
                BalanceController::new(SlidingMass, &config(CommandMode::Position, gains)).unwrap();
            let (q, v) = (0.02, -0.1);

            let u = run(&mut controller, 0..7, q, v);

            let target = &controller.target().state;
            assert_close!(u, -(kp * (q - target.q[0]) + kd * (v - target.v[0])), 1e-9);
            assert!(target.q[0] != 0.);
        }
    }

    #[test]
    fn telemetry_reports_reference_and_perturbation() {
        let mut cfg = config(CommandMode::Torque, GainOverrides::default());
        cfg.perturbation.time = 1.6;
        cfg.perturbation.magnitude = 0.02;
        let mut controller = BalanceController::new(SlidingMass, &cfg).unwrap();
        let sensors = SensorFrame::new(vec![]);
        let (q, v) = (dvector![0.], dvector![0.]);
        let mut command = dvector![0.];

        controller
            .compute_command(1.7, &q, &v, &sensors, &mut command)
            .unwrap();

        let telemetry = controller.telemetry();
        assert_close!(telemetry.get("comReferenceX").unwrap(), 0.041 + 0.02, 1e-12);
        assert_close!(telemetry.get("zmpReferenceX").unwrap(), 0.041 + 0.02, 1e-12);
        assert_eq!(telemetry.get("vcomReferenceX").unwrap(), 0.);
        assert!(telemetry
            .names()
            .contains(&"HighLevelController.targetPositionX".to_string()));
    }

    #[test]
    fn running_past_the_reference_is_an_error() {
        let mut controller =
            BalanceController::new(SlidingMass, &config(CommandMode::Torque, GainOverrides::default()))
                .unwrap();
        let sensors = SensorFrame::new(vec![]);
        let mut command = dvector![0.];

        let result =
            controller.compute_command(2.0, &dvector![0.], &dvector![0.], &sensors, &mut command);

        assert!(matches!(
            result,
            Err(BalanceError::ReferenceExhausted { index: 2001, len: 2001 })
        ));
    }

    #[test]
    fn internal_dynamics_zeroes_effort() {
        let mut controller =
            BalanceController::new(SlidingMass, &config(CommandMode::Torque, GainOverrides::default()))
                .unwrap();
        let mut effort = dvector![3.];

        controller
            .internal_dynamics(0., &dvector![0.], &dvector![0.], &SensorFrame::new(vec![]), &mut effort)
            .unwrap();

        assert_eq!(effort[0], 0.);
    }

    /// SlidingMass whose single contact, "Sole", sits at (x, 0, 0). Any
    /// positive normal force on it puts the ZMP at (x, 0).
    struct MassOnSole {
        contacts: Vec<String>,
        x: Float,
    }

    impl MassOnSole {
        fn new(x: Float) -> Self {
            MassOnSole {
                contacts: vec!["Sole".to_string()],
                x,
            }
        }

        fn sensors() -> SensorFrame {
            SensorFrame::new(vec![ForceReading {
                sensor: "F1".to_string(),
                contact: "Sole".to_string(),
                force: vector![0., 0., 500.],
            }])
        }
    }

    impl Mechanism for MassOnSole {
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
            SlidingMass.center_of_mass(q, v)
        }

        fn frame_placement(&self, frame: &str, _q: &DVector<Float>) -> Result<Transform3D> {
            if frame == "Sole" {
                return Ok(Transform3D::move_xyz(frame, WORLD_FRAME, self.x, 0., 0.));
            }
            Err(BalanceError::UnknownFrame(frame.to_string()))
        }

        fn contact_frames(&self) -> &[String] {
            &self.contacts
        }
    }

    const LAW_GAINS: GainOverrides = GainOverrides {
        kp: None,
        kd: None,
        kp_dcm: Some(4.),
        kd_dcm: Some(2.),
        ki_dcm: Some(3.),
        decay: Some(0.25),
        admittance: Some(20.),
    };

    /// Three corrections (ticks 0, 5, 10) in torque mode with the plant frozen
    /// at (q, v). The target never moves in torque mode, so it stays at rest.
    fn three_corrections(
        feedback: FeedbackMode,
        clamp: Option<Float>,
        sole_x: Float,
        q: Float,
        v: Float,
    ) -> (BalanceController<MassOnSole>, Float) {
        let mut cfg = config(CommandMode::Torque, LAW_GAINS);
        cfg.feedback = feedback;
        if let Some(bound) = clamp {
            cfg.clamp.enabled = true;
            cfg.clamp.bound = bound;
        }
        let mut controller = BalanceController::new(MassOnSole::new(sole_x), &cfg).unwrap();
        let sensors = MassOnSole::sensors();
        let mut command = dvector![0.];
        let (q, v) = (dvector![q], dvector![v]);
        for k in 0..=10 {
            controller
                .compute_command(k as Float * 1e-3, &q, &v, &sensors, &mut command)
                .unwrap();
        }
        assert_eq!(controller.corrections(), 3);
        (controller, command[0])
    }

    /// Hand evaluation of the correction for a zero reference
    fn expected_law(
        dcm_fb: Float,
        zmp_fb: Float,
        clamp: Option<Float>,
        q: Float,
        v: Float,
    ) -> (Float, Float) {
        let omega = GRAVITY.sqrt();
        let (kp_dcm, kd_dcm, ki_dcm, decay, admittance) = (4., 2., 3., 0.25, 20.);
        let error = 0. - dcm_fb;
        let mut integral = 0.;
        for dt in [0., 0.005, 0.005] {
            integral = (1. - decay) * integral + dt * error;
        }

        let mut zmp_cmd = 0. - (1. + kp_dcm / omega) * error + (kd_dcm / omega) * (0. - zmp_fb)
            - (ki_dcm / omega) * integral;
        if let Some(bound) = clamp {
            zmp_cmd = zmp_cmd.clamp(-bound, bound);
        }
        let ax = 0. + admittance * (zmp_fb - zmp_cmd);
        let ddq = ax / (1. * q.cos()) + v * v * q.tan();
        let torque = 75. * 1. * (ddq - GRAVITY * q.sin() / 1.);
        (zmp_cmd, torque)
    }

    #[test]
    fn correction_follows_the_law_in_every_feedback_mode() {
        let (q, v, sole_x) = (0.01, 0.02, 0.03);
        let omega = GRAVITY.sqrt();

        // Feedback DCM per mode; the target is at rest and both ZMPs read the sole
        for (feedback, dcm_fb) in [
            (FeedbackMode::ActualFeedback, q + v / omega),
            (FeedbackMode::MixedFeedback, q),
            (FeedbackMode::TargetFeedback, 0.),
        ] {
            let (controller, torque) = three_corrections(feedback, None, sole_x, q, v);

            let (zmp_cmd, expected_torque) = expected_law(dcm_fb, sole_x, None, q, v);
            assert_close!(controller.zmp_command(), zmp_cmd, 1e-12);
            assert_close!(torque, expected_torque, 1e-8);
            assert_close!(controller.integral(), 0.00875 * -dcm_fb, 1e-12);
        }
    }

    #[test]
    fn clamped_zmp_command_drives_the_admittance() {
        let (q, v, sole_x) = (0.01, 0.02, 0.03);
        let omega = GRAVITY.sqrt();
        let bound = 0.001;

        let (controller, torque) =
            three_corrections(FeedbackMode::ActualFeedback, Some(bound), sole_x, q, v);

        let (unclamped, _) = expected_law(q + v / omega, sole_x, None, q, v);
        let (zmp_cmd, expected_torque) = expected_law(q + v / omega, sole_x, Some(bound), q, v);
        assert!(unclamped > bound);
        assert_eq!(controller.zmp_command(), bound);
        assert_eq!(zmp_cmd, bound);
        assert_close!(torque, expected_torque, 1e-8);
    }
}
