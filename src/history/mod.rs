// src/history/mod.rs

use anyhow::{Context, Result};
use arrow::array::{Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use glob::{glob, Pattern};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::{
    collections::BTreeSet,
    fmt, fs,
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Lineage events a run records against an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The run consumed this artifact.
    Used,
    /// The run produced this artifact.
    Logged,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Used => "used",
            Event::Logged => "logged",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run ledger backed by Parquet files and one YAML config per run.
pub struct History {
    history_dir: PathBuf,
}

impl History {
    /// Construct a new History store at `history_dir`, creating the directory if needed.
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir)
            .with_context(|| format!("creating history directory {:?}", &history_dir))?;
        Ok(Self { history_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.history_dir
    }

    /// Write `config` to `<run_id>/config.yaml`.
    pub fn record_config<C: Serialize>(&self, run_id: &str, config: &C) -> Result<PathBuf> {
        let run_dir = self.history_dir.join(run_id);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("creating run directory {:?}", &run_dir))?;
        let path = run_dir.join("config.yaml");
        let yaml = serde_yaml::to_string(config).context("serialising run config")?;
        fs::write(&path, yaml).with_context(|| format!("writing {:?}", &path))?;
        Ok(path)
    }

    /// Record `event` for `artifact` in run `run_id`.
    /// Writes a single-row Parquet file named `<run_id>---<event>---<ts>.parquet`.
    pub fn record_event(&self, run_id: &str, event: Event, artifact: &str) -> Result<PathBuf> {
        // Timestamp in microseconds
        let ts = Utc::now().timestamp_micros();
        let filename = format!("{}---{}---{}.parquet", run_id, event, ts);
        let path = self.history_dir.join(filename);

        let schema = Arc::new(Self::schema());
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![run_id.to_string()])),
                Arc::new(StringArray::from(vec![event.to_string()])),
                Arc::new(StringArray::from(vec![artifact.to_string()])),
                Arc::new(TimestampMicrosecondArray::from_iter_values(vec![ts])),
            ],
        )
        .context("building history record batch")?;

        let file =
            File::create(&path).with_context(|| format!("creating history file {:?}", &path))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, schema, Some(props))
            .context("creating Arrow writer for history")?;
        writer.write(&batch).context("writing history batch")?;
        writer.close().context("closing history writer")?;
        Ok(path)
    }

    /// All distinct artifacts recorded under `event`, across runs.
    pub fn load_artifacts(&self, event: Event) -> Result<BTreeSet<String>> {
        let pattern = format!(
            "{}/*---{}---*.parquet",
            Pattern::escape(&self.history_dir.display().to_string()),
            event
        );
        let mut set = BTreeSet::new();
        for entry in glob(&pattern)? {
            let path = entry?;
            let file = File::open(&path).with_context(|| format!("opening {:?}", &path))?;
            let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
            for batch in reader {
                let batch = batch?;
                let col = batch
                    .column_by_name("artifact")
                    .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                    .with_context(|| format!("{:?} has no artifact column", &path))?;
                for i in 0..col.len() {
                    if !col.is_null(i) {
                        set.insert(col.value(i).to_string());
                    }
                }
            }
        }
        Ok(set)
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("run_id", DataType::Utf8, false),
            Field::new("event", DataType::Utf8, false),
            Field::new("artifact", DataType::Utf8, false),
            Field::new(
                "event_time",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Serialize)]
    struct Cfg {
        min_price: f64,
        output_type: String,
    }

    #[test]
    fn test_record_and_load_events() {
        let tmp = tempdir().unwrap();
        let hist = History::new(tmp.path().join("runs")).unwrap();

        hist.record_event("run-a", Event::Used, "sample.csv:v0").unwrap();
        hist.record_event("run-a", Event::Logged, "clean_sample.csv:v0")
            .unwrap();
        hist.record_event("run-b", Event::Used, "sample.csv:v0").unwrap();
        hist.record_event("run-b", Event::Logged, "clean_sample.csv:v1")
            .unwrap();

        let used = hist.load_artifacts(Event::Used).unwrap();
        assert_eq!(used.into_iter().collect::<Vec<_>>(), vec!["sample.csv:v0"]);

        let logged = hist.load_artifacts(Event::Logged).unwrap();
        assert_eq!(
            logged.into_iter().collect::<Vec<_>>(),
            vec!["clean_sample.csv:v0", "clean_sample.csv:v1"]
        );
    }

    #[test]
    fn test_empty_history() {
        let tmp = tempdir().unwrap();
        let hist = History::new(tmp.path()).unwrap();
        assert!(hist.load_artifacts(Event::Used).unwrap().is_empty());
    }

    #[test]
    fn test_record_config_yaml() {
        let tmp = tempdir().unwrap();
        let hist = History::new(tmp.path()).unwrap();
        let path = hist
            .record_config(
                "run-a",
                &Cfg {
                    min_price: 10.0,
                    output_type: "clean_sample".into(),
                },
            )
            .unwrap();

        assert_eq!(path, tmp.path().join("run-a").join("config.yaml"));
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("min_price: 10.0"));
        assert!(text.contains("output_type: clean_sample"));
    }
}
