use pendulum_balance::{
    assert_close,
    config::BalanceConfig,
    control::{CommandMode, FeedbackMode},
    error::BalanceError,
    simulate::{run_balance, SimulationOutput},
    telemetry::TIME_COLUMN,
    types::Float,
};

fn config(feedback: FeedbackMode, duration: Float) -> BalanceConfig {
    let mut config = BalanceConfig {
        feedback,
        command: CommandMode::Position,
        ..BalanceConfig::default()
    };
    config.reference.duration = duration;
    config.clamp.enabled = true;
    config
}

fn column(output: &SimulationOutput, name: &str) -> Vec<Float> {
    output
        .log
        .column(name)
        .unwrap_or_else(|| panic!("missing channel {}", name))
}

#[test]
fn logged_reference_holds_ramps_and_holds() {
    // Arrange
    let config = config(FeedbackMode::ActualFeedback, 2.0);

    // Act
    let output = run_balance(&config).unwrap();

    // Assert
    let reference = column(&output, "comReferenceX");
    assert_eq!(reference.len(), 2000);
    // Tick k logs the reference sample k + 1
    assert_eq!(reference[0], 0.);
    assert_eq!(reference[498], 0.);
    assert_close!(reference[499], 0., 1e-15);
    assert_close!(reference[999], 0.041 * 500. / 1000., 1e-12);
    assert_close!(reference[1499], 0.041, 1e-12);
    assert_close!(reference[1999], 0.041, 1e-12);
    assert_eq!(column(&output, "zmpReferenceX"), reference);
}

#[test]
fn actual_feedback_tracks_the_reference_inside_the_clamp_band() {
    // Arrange
    let config = config(FeedbackMode::ActualFeedback, 4.0);

    // Act
    let output = run_balance(&config).unwrap();

    // Assert
    let zmp_cmd = column(&output, "zmpCmdX");
    assert!(zmp_cmd.iter().all(|z| z.abs() <= config.clamp.bound));

    let com = column(&output, "comX");
    assert!(com[..400].iter().all(|x| x.abs() < 1e-9));
    assert_close!(*com.last().unwrap(), 0.041, 0.01);
    assert_close!(*zmp_cmd.last().unwrap(), 0.041, 0.01);

    assert!(output.qs.iter().all(|q| q[0].abs() < 0.1));
}

#[test]
fn every_feedback_mode_settles_on_the_target_offset() {
    for feedback in [
        FeedbackMode::TargetFeedback,
        FeedbackMode::MixedFeedback,
        FeedbackMode::ActualFeedback,
    ] {
        let output = run_balance(&config(feedback, 4.0)).unwrap();

        let com = column(&output, "comX");
        let last = *com.last().unwrap();
        assert!(
            (last - 0.041).abs() < 0.01,
            "{:?} ended at com x = {}",
            feedback,
            last
        );
    }
}

#[test]
fn perturbation_shifts_the_balance_point() {
    // Arrange
    let mut config = config(FeedbackMode::ActualFeedback, 6.0);
    config.perturbation.time = 3.0;
    config.perturbation.magnitude = 0.02;

    // Act
    let output = run_balance(&config).unwrap();

    // Assert
    let reference = column(&output, "comReferenceX");
    assert_close!(reference[2999], 0.041, 1e-12);
    assert_close!(reference[3001], 0.061, 1e-12);
    let com = column(&output, "comX");
    assert_close!(*com.last().unwrap(), 0.061, 0.01);
}

#[test]
fn noisy_runs_are_reproducible_for_a_given_seed() {
    // Arrange
    let mut config = config(FeedbackMode::ActualFeedback, 0.3);
    config.sensors.noise_std = 2.0;

    // Act
    let first = run_balance(&config).unwrap();
    let second = run_balance(&config).unwrap();
    config.simulation.seed = 7;
    let reseeded = run_balance(&config).unwrap();

    // Assert
    assert_eq!(column(&first, "zmpX"), column(&second, "zmpX"));
    assert_eq!(first.qs, second.qs);
    assert_ne!(column(&first, "zmpX"), column(&reseeded, "zmpX"));
}

#[test]
fn log_is_written_as_csv() {
    // Arrange
    let output = run_balance(&config(FeedbackMode::MixedFeedback, 0.01)).unwrap();
    let mut buffer = Vec::new();

    // Act
    output.log.write_csv(&mut buffer).unwrap();

    // Assert
    let text = String::from_utf8(buffer).unwrap();
    let mut lines = text.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(header[0], TIME_COLUMN);
    assert_eq!(header[1], "HighLevelController.targetPositionX");
    assert!(header.contains(&"HighLevelController.wrenchForceZ"));
    assert_eq!(lines.count(), 10);
}

#[test]
fn undamped_position_loop_on_actual_feedback_aborts_when_it_diverges() {
    // Arrange
    let mut config = config(FeedbackMode::ActualFeedback, 4.0);
    config.gains.kd = Some(0.);

    // Act
    let result = run_balance(&config);

    // Assert
    assert!(matches!(result, Err(BalanceError::Mechanism(_))));
}
