use std::{fs::File, io::BufWriter, path::PathBuf, process};

use clap::Parser;
use pendulum_balance::{
    config::BalanceConfig,
    control::{CommandMode, FeedbackMode},
    error::Result,
    simulate::run_balance,
};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Balance an inverted pendulum on its foot by DCM/ZMP control
#[derive(Parser, Debug)]
#[command(name = "balance")]
#[command(version)]
struct Args {
    /// TOML configuration; defaults are used for anything it leaves out
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Simulation duration [s]
    #[arg(long)]
    tf: Option<f64>,

    /// Frequency of the DCM correction [Hz]
    #[arg(long)]
    fhlc: Option<f64>,

    /// Send joint torques computed by inverse dynamics instead of a PD
    /// tracking the integrated target
    #[arg(long)]
    acceleration: bool,

    /// Close the DCM loop on the target state
    #[arg(long)]
    targets_fb: bool,

    /// Close the DCM loop on measured COM and target COM velocity
    #[arg(long)]
    mixed_fb: bool,

    /// Clamp the ZMP command to the configured band
    #[arg(long)]
    clamp_cmd: bool,

    /// Where to write the telemetry log
    #[arg(long, value_name = "CSV", default_value = "balance_log.csv")]
    log: PathBuf,

    /// Enable verbose logging (DEBUG level)
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            BalanceConfig::load(path)?
        }
        None => BalanceConfig::default(),
    };

    if let Some(tf) = args.tf {
        config.reference.duration = tf;
    }
    if let Some(fhlc) = args.fhlc {
        config.rates.high_level_frequency = fhlc;
    }
    if args.acceleration {
        config.command = CommandMode::Torque;
    }
    if args.targets_fb || args.mixed_fb {
        config.feedback = FeedbackMode::from_flags(args.targets_fb, args.mixed_fb)?;
    }
    if args.clamp_cmd {
        config.clamp.enabled = true;
    }

    let output = run_balance(&config)?;

    let mut writer = BufWriter::new(File::create(&args.log)?);
    output.log.write_csv(&mut writer)?;
    info!(
        "Wrote {} samples to {}",
        output.log.len(),
        args.log.display()
    );

    if let Some(com) = output.log.column("HighLevelController.comX") {
        if let Some(last) = com.last() {
            info!("Final COM x: {:.4} m", last);
        }
    }
    Ok(())
}

fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();
}
