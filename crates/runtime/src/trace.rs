use std::{fs::File, io::BufWriter, path::Path};

use serde::{Deserialize, Serialize};

use crate::phase::Phase;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TraceEvent {
    PhaseStarted { time: f64, phase: Phase },
    PhaseCompleted { time: f64, phase: Phase },
    ProtocolError { time: f64, message: String },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Trace {
    pub events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self).map_err(std::io::Error::other)
    }
}
