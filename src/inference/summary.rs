//! Persisted summary stream: one JSON event per line in `events.jsonl`

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::tacotron::{SummaryItem, SummaryValue};

/// File name of the stream inside a run directory
pub const EVENTS_FILE: &str = "events.jsonl";

/// One persisted summary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Global step the entry belongs to
    pub step: usize,
    /// Seconds since the Unix epoch
    pub wall_time: f64,
    /// Entry tag
    pub tag: String,
    /// Scalar or image payload
    #[serde(flatten)]
    pub value: SummaryValue,
}

/// Appends events to `<dir>/events.jsonl`
pub struct SummaryWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl SummaryWriter {
    /// Open the stream of a run directory, creating it if needed
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        std::fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(EVENTS_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Summary stream at {:?}", path);
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Stream location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append all items for `step` and flush
    pub fn write(&mut self, step: usize, items: &[SummaryItem]) -> Result<()> {
        let wall_time = wall_time();
        for item in items {
            let event = Event {
                step,
                wall_time,
                tag: item.tag.clone(),
                value: item.value.clone(),
            };
            serde_json::to_writer(&mut self.writer, &event)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Append one scalar
    pub fn write_scalar(&mut self, step: usize, tag: &str, value: f32) -> Result<()> {
        self.write(
            step,
            &[SummaryItem {
                tag: tag.to_string(),
                value: SummaryValue::Scalar { value },
            }],
        )
    }
}

/// Read every event of a stream file
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<Event>> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}

fn wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_events_append_across_writers() {
        let dir = tempdir().unwrap();
        let run = dir.path().join("inference");

        let mut writer = SummaryWriter::create(&run).unwrap();
        writer.write_scalar(3, "loss", 0.5).unwrap();
        drop(writer);

        let mut writer = SummaryWriter::create(&run).unwrap();
        writer
            .write(
                4,
                &[SummaryItem {
                    tag: "normalized_outputs/linear_spec".to_string(),
                    value: SummaryValue::Image {
                        height: 1,
                        width: 2,
                        pixels: vec![0, 255],
                    },
                }],
            )
            .unwrap();

        let events = read_events(writer.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].step, 3);
        assert_eq!(events[0].value, SummaryValue::Scalar { value: 0.5 });
        assert_eq!(events[1].tag, "normalized_outputs/linear_spec");
        assert!(events[1].wall_time > 0.0);
    }
}
