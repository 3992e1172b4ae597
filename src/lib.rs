#![allow(non_snake_case)]

use types::Float;
pub extern crate nalgebra as na;

pub mod config;
pub mod control;
pub mod error;
pub mod estimator;
pub mod integrators;
pub mod mechanism;
pub mod pendulum;
pub mod reference;
pub mod sensor;
pub mod simulate;
pub mod spatial;
pub mod telemetry;
pub mod types;
pub mod util;

pub const GRAVITY: Float = 9.81;

/// Name of the inertial frame every estimate is expressed in
pub const WORLD_FRAME: &str = "world";
