use std::{collections::HashSet, io::Write};

use crate::{
    error::{BalanceError, Result},
    types::Float,
};

pub const TIME_COLUMN: &str = "Global.Time";

/// Handle on N consecutive telemetry slots of one [`TelemetryRecorder`].
///
/// Writes through a handle always cover all N slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels<const N: usize> {
    offset: usize,
}

/// Named scalar slots written in place by their owner every tick, and read by
/// a logger between ticks.
#[derive(Debug, Clone, Default)]
pub struct TelemetryRecorder {
    namespace: Option<String>,
    names: Vec<String>,
    known: HashSet<String>,
    values: Vec<Float>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        TelemetryRecorder::default()
    }

    /// Exported names are prefixed with `namespace.`
    pub fn with_namespace(namespace: &str) -> Self {
        TelemetryRecorder {
            namespace: Some(namespace.to_string()),
            ..TelemetryRecorder::default()
        }
    }

    /// Register a block of channels with their initial values.
    ///
    /// Names must be non-empty and unique within the recorder.
    pub fn register<S: AsRef<str>, const N: usize>(
        &mut self,
        names: [S; N],
        initial: [Float; N],
    ) -> Result<Channels<N>> {
        let mut batch = HashSet::new();
        for name in names.iter().map(|n| n.as_ref()) {
            if name.is_empty() {
                return Err(BalanceError::InvalidConfig(
                    "telemetry channel name must not be empty".to_string(),
                ));
            }
            if self.known.contains(name) || !batch.insert(name) {
                return Err(BalanceError::DuplicateChannel(name.to_string()));
            }
        }

        let offset = self.values.len();
        for name in names.iter() {
            let name = name.as_ref().to_string();
            self.known.insert(name.clone());
            self.names.push(name);
        }
        self.values.extend_from_slice(&initial);
        Ok(Channels { offset })
    }

    /// Overwrite every slot of the block.
    ///
    /// `channels` must come from `register` on this same recorder.
    pub fn write<const N: usize>(&mut self, channels: &Channels<N>, values: [Float; N]) {
        debug_assert!(
            channels.offset + N <= self.values.len(),
            "channels {}..{} outside a recorder of {} slots",
            channels.offset,
            channels.offset + N,
            self.values.len()
        );
        self.values[channels.offset..channels.offset + N].copy_from_slice(&values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Channel names as exported, including the namespace
    pub fn names(&self) -> Vec<String> {
        self.names
            .iter()
            .map(|name| match &self.namespace {
                Some(namespace) => format!("{}.{}", namespace, name),
                None => name.clone(),
            })
            .collect()
    }

    pub fn values(&self) -> &[Float] {
        &self.values
    }

    /// Latest value of a channel, looked up by its registered (unqualified) name
    pub fn get(&self, name: &str) -> Option<Float> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }
}

/// Names of a spatial quantity, e.g. comX, comY, comZ
pub fn spatial_names(prefix: &str) -> [String; 3] {
    ["X", "Y", "Z"].map(|axis| format!("{}{}", prefix, axis))
}

/// Names of a ground-plane quantity, e.g. zmpX, zmpY
pub fn planar_names(prefix: &str) -> [String; 2] {
    ["X", "Y"].map(|axis| format!("{}{}", prefix, axis))
}

/// Time series of telemetry snapshots, one row per sample.
#[derive(Debug, Clone)]
pub struct TelemetryLog {
    header: Vec<String>,
    times: Vec<Float>,
    rows: Vec<Vec<Float>>,
}

impl TelemetryLog {
    pub fn new(recorder: &TelemetryRecorder) -> Self {
        TelemetryLog {
            header: recorder.names(),
            times: vec![],
            rows: vec![],
        }
    }

    /// Record the current content of the recorder. Must not be called while
    /// the recorder's owner is in the middle of a tick.
    pub fn sample(&mut self, t: Float, recorder: &TelemetryRecorder) {
        self.times.push(t);
        self.rows.push(recorder.values().to_vec());
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn times(&self) -> &[Float] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Values of a channel over time, looked up by exported or unqualified name
    pub fn column(&self, name: &str) -> Option<Vec<Float>> {
        let index = self.header.iter().position(|h| {
            h == name || h.rsplit_once('.').map_or(false, |(_, short)| short == name)
        })?;
        Some(self.rows.iter().map(|row| row[index]).collect())
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        let header = std::iter::once(TIME_COLUMN).chain(self.header.iter().map(|h| h.as_str()));
        out.write_record(header)?;
        for (t, row) in self.times.iter().zip(self.rows.iter()) {
            out.write_record(std::iter::once(t).chain(row.iter()).map(|x| x.to_string()))?;
        }
        out.flush()?;
        Ok(())
    }
}
