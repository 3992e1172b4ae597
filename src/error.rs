use thiserror::Error;

use crate::types::Float;

/// Errors raised while configuring or running the balance controller.
///
/// Configuration errors are detected before the simulation starts. Errors
/// coming from the mechanism abort the tick they occur in.
#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("telemetry channel {0:?} is registered twice")]
    DuplicateChannel(String),

    #[error("high-level rate {high_level_frequency} Hz does not divide the low-level rate {low_level_frequency} Hz")]
    RateRatio {
        low_level_frequency: Float,
        high_level_frequency: Float,
    },

    #[error("target feedback and mixed feedback cannot both be selected")]
    ConflictingFeedback,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mechanism failure: {0}")]
    Mechanism(String),

    #[error("unknown frame {0:?}")]
    UnknownFrame(String),

    #[error("no force sensor attached to contact {0:?}")]
    UnknownSensor(String),

    #[error("reference trajectory has {len} samples, index {index} requested")]
    ReferenceExhausted { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, BalanceError>;
