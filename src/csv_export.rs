use crate::advisor::Recommendation;
use crate::error::Result;
use crate::game::{PlayerId, Tick};
use csv::Writer;
use std::path::{Path, PathBuf};

/// One executed recommendation, as logged to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRecord {
    pub tick: Tick,
    pub player: PlayerId,
    pub advisor: &'static str,
    pub priority: &'static str,
    pub score: f64,
    pub executions: usize,
    pub reason: String,
}

impl DecisionRecord {
    pub fn new(tick: Tick, player: PlayerId, rec: &Recommendation) -> Self {
        Self {
            tick,
            player,
            advisor: rec.advisor.name(),
            priority: rec.priority.name(),
            score: rec.score,
            executions: rec.executions.len(),
            reason: rec.reason.clone(),
        }
    }
}

/// Buffered CSV writer for the decision log. Appends to an existing file;
/// the header is only written when the file is new.
pub struct BufferedCsvExporter {
    path: PathBuf,
    buffer: Vec<DecisionRecord>,
    buffer_size: usize,
    written: usize,
}

impl BufferedCsvExporter {
    pub fn new(path: &Path, buffer_size: usize) -> Self {
        Self {
            path: path.to_owned(),
            buffer: Vec::with_capacity(buffer_size),
            buffer_size: buffer_size.max(1),
            written: 0,
        }
    }

    pub fn add(&mut self, record: DecisionRecord) -> Result<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.buffer_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn extend<I: IntoIterator<Item = DecisionRecord>>(&mut self, records: I) -> Result<()> {
        for record in records {
            self.add(record)?;
        }
        Ok(())
    }

    /// Records written so far, not counting the buffer.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let file_exists = self.path.exists();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = Writer::from_writer(file);

        // Write header if file is new
        if !file_exists {
            writer.write_record([
                "tick",
                "player",
                "advisor",
                "priority",
                "score",
                "executions",
                "reason",
            ])?;
        }

        // Write all buffered records
        for record in &self.buffer {
            writer.write_record(&[
                record.tick.to_string(),
                record.player.to_string(),
                record.advisor.to_string(),
                record.priority.to_string(),
                format!("{:.3}", record.score),
                record.executions.to_string(),
                record.reason.clone(),
            ])?;
        }

        writer.flush()?;
        self.written += self.buffer.len();
        self.buffer.clear();

        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        self.flush()?;
        Ok(self.written)
    }
}
