use anyhow::{Context, Result};
use latprobe_model::MeasurementEnvelope;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Downstream consumer of measurement envelopes.
pub trait Emitter: Send {
    fn name(&self) -> &str;

    /// Called once before the first envelope is emitted.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn emit(&mut self, envelope: &MeasurementEnvelope) -> Result<()>;
}

/// Writes each envelope as one JSON object per line, flushed per record.
pub struct JsonLinesEmitter<W: Write> {
    name: String,
    writer: W,
}

impl<W: Write> JsonLinesEmitter<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesEmitter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new("stdout", io::stdout())
    }
}

impl JsonLinesEmitter<BufWriter<File>> {
    /// Appends to `path`, creating it if needed.
    pub fn file(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open emit file {:?}", path))?;
        Ok(Self::new(path.display().to_string(), BufWriter::new(file)))
    }
}

impl<W: Write + Send> Emitter for JsonLinesEmitter<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn emit(&mut self, envelope: &MeasurementEnvelope) -> Result<()> {
        serde_json::to_writer(&mut self.writer, envelope)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Stand-in used when no downstream consumer is configured.
#[derive(Debug, Default)]
pub struct NullEmitter;

impl Emitter for NullEmitter {
    fn name(&self) -> &str {
        "null"
    }

    fn emit(&mut self, _envelope: &MeasurementEnvelope) -> Result<()> {
        Ok(())
    }
}

/// Keeps every envelope in a shared buffer.
#[derive(Debug, Default, Clone)]
pub struct MemoryEmitter {
    records: Arc<Mutex<Vec<MeasurementEnvelope>>>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<MeasurementEnvelope> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Emitter for MemoryEmitter {
    fn name(&self) -> &str {
        "memory"
    }

    fn emit(&mut self, envelope: &MeasurementEnvelope) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(envelope.clone());
        Ok(())
    }
}
