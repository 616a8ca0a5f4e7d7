use crate::receiver::Observation;
use anyhow::Result;
use csv::Writer;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Flat CSV row for one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub receiver: u32,
    pub sender: String,
    pub sequence: u32,
    pub send_time_s: f64,
    pub recv_time_s: f64,
    pub latency_ms: f64,
    pub protocol: String,
}

impl From<&Observation> for ObservationRecord {
    fn from(obs: &Observation) -> Self {
        Self {
            receiver: obs.receiver.0,
            sender: obs.sender.to_string(),
            sequence: obs.sequence,
            send_time_s: obs.send_timestamp.as_secs_f64(),
            recv_time_s: obs.recv_timestamp.as_secs_f64(),
            latency_ms: obs.latency().as_secs_f64() * 1000.0,
            protocol: format!("0x{:x}", obs.mode),
        }
    }
}

pub struct ObservationLogger {
    writer: Writer<File>,
}

impl ObservationLogger {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let writer = Writer::from_path(path)?;
        Ok(Self { writer })
    }

    pub fn log(&mut self, observation: &Observation) -> Result<()> {
        self.writer.serialize(ObservationRecord::from(observation))?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn log_batch(&mut self, observations: &[Observation]) -> Result<()> {
        for observation in observations {
            self.writer.serialize(ObservationRecord::from(observation))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads back a file written by [`ObservationLogger`].
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<ObservationRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}
