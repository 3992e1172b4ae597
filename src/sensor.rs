use itertools::izip;
use na::Vector3;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::{
    error::{BalanceError, Result},
    types::Float,
};

/// Force measured at one contact point, expressed in the contact frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceReading {
    pub sensor: String,
    pub contact: String,
    pub force: Vector3<Float>,
}

/// All force readings of one tick, in sensor registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorFrame {
    readings: Vec<ForceReading>,
}

impl SensorFrame {
    pub fn new(readings: Vec<ForceReading>) -> Self {
        SensorFrame { readings }
    }

    /// Frame with one reading per contact, with the sensor named after its contact.
    pub fn from_contacts(contacts: &[String], forces: &[Vector3<Float>]) -> Self {
        let readings = izip!(contacts.iter(), forces.iter())
            .map(|(contact, force)| ForceReading {
                sensor: contact.clone(),
                contact: contact.clone(),
                force: *force,
            })
            .collect();
        SensorFrame { readings }
    }

    pub fn readings(&self) -> &[ForceReading] {
        &self.readings
    }

    /// Force measured at the given contact frame
    pub fn force(&self, contact: &str) -> Result<&Vector3<Float>> {
        self.readings
            .iter()
            .find(|r| r.contact == contact)
            .map(|r| &r.force)
            .ok_or_else(|| BalanceError::UnknownSensor(contact.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForceSensorOptions {
    /// Standard deviation of the additive white noise, per axis
    pub noise_std: Float,
    /// Constant offset, per axis
    pub bias: [Float; 3],
}

impl Default for ForceSensorOptions {
    fn default() -> Self {
        ForceSensorOptions {
            noise_std: 0.,
            bias: [0.; 3],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForceSensor {
    pub name: String,
    pub contact: String,
    noise: Option<Normal<Float>>,
    bias: Vector3<Float>,
}

impl ForceSensor {
    pub fn new(name: &str, contact: &str, options: &ForceSensorOptions) -> Result<Self> {
        let noise = if options.noise_std > 0. {
            let normal = Normal::new(0., options.noise_std).map_err(|e| {
                BalanceError::InvalidConfig(format!("force sensor {}: {}", name, e))
            })?;
            Some(normal)
        } else if options.noise_std == 0. {
            None
        } else {
            return Err(BalanceError::InvalidConfig(format!(
                "force sensor {}: negative noise std {}",
                name, options.noise_std
            )));
        };

        Ok(ForceSensor {
            name: name.to_string(),
            contact: contact.to_string(),
            noise,
            bias: Vector3::from(options.bias),
        })
    }

    fn measure(&self, force: &Vector3<Float>, rng: &mut StdRng) -> Vector3<Float> {
        let mut measured = force + self.bias;
        if let Some(noise) = &self.noise {
            measured.iter_mut().for_each(|f| *f += noise.sample(rng));
        }
        measured
    }
}

/// The force sensors of a model, sharing one seeded random source so that
/// runs are reproducible.
pub struct ForceSensorSet {
    sensors: Vec<ForceSensor>,
    rng: StdRng,
}

impl ForceSensorSet {
    pub fn new(sensors: Vec<ForceSensor>, seed: u64) -> Self {
        ForceSensorSet {
            sensors,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// One sensor per contact frame, named F1, F2, ...
    pub fn for_contacts(
        contacts: &[String],
        options: &ForceSensorOptions,
        seed: u64,
    ) -> Result<Self> {
        let sensors = contacts
            .iter()
            .enumerate()
            .map(|(i, contact)| ForceSensor::new(&format!("F{}", i + 1), contact, options))
            .collect::<Result<Vec<_>>>()?;
        Ok(ForceSensorSet::new(sensors, seed))
    }

    /// Sample every sensor given the true contact forces, which must be in the
    /// same order as `contacts`.
    pub fn measure(
        &mut self,
        contacts: &[String],
        true_forces: &[Vector3<Float>],
    ) -> Result<SensorFrame> {
        let mut readings = Vec::with_capacity(self.sensors.len());
        for sensor in self.sensors.iter() {
            let index = contacts
                .iter()
                .position(|c| *c == sensor.contact)
                .ok_or_else(|| BalanceError::UnknownFrame(sensor.contact.clone()))?;
            readings.push(ForceReading {
                sensor: sensor.name.clone(),
                contact: sensor.contact.clone(),
                force: sensor.measure(&true_forces[index], &mut self.rng),
            });
        }
        Ok(SensorFrame::new(readings))
    }
}
