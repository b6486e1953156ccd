//! Batch orchestration over a set of named entries.
//!
//! Pairs are discovered by name, repaired one at a time in discovery
//! order, and every attempt gets a line in the report. A failed pair never
//! stops the batch; only finding no pairs at all does.

use std::fmt;

use tracing::{info, warn};

use crate::config::RepairConfig;
use crate::detector::Detector;
use crate::engine::{RepairEngine, SUCCESS_MESSAGE};
use crate::error::{Error, RepairFailure, Result};
use crate::pairing::{self, RepairTask};

/// First line of every report.
pub const REPORT_HEADER: &str = "--- Watermark Repair Report ---";

/// A named blob, as stored in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntry {
    /// Entry path.
    pub name: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

impl NamedEntry {
    /// Create an entry.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Anything that can list entry names and read an entry's bytes.
pub trait EntrySource {
    /// All entry paths, in container order.
    fn entry_names(&self) -> Vec<String>;

    /// Read one entry by path.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing or unreadable.
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;
}

impl EntrySource for [NamedEntry] {
    fn entry_names(&self) -> Vec<String> {
        self.iter().map(|e| e.name.clone()).collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        self.iter()
            .rev()
            .find(|e| e.name == name)
            .map(|e| e.data.clone())
            .ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no entry named {name}"),
                ))
            })
    }
}

impl EntrySource for Vec<NamedEntry> {
    fn entry_names(&self) -> Vec<String> {
        self.as_slice().entry_names()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        self.as_mut_slice().read_entry(name)
    }
}

/// Progress signal emitted before each task starts.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    /// 1-based task number.
    pub index: usize,
    /// Number of tasks in the batch.
    pub total: usize,
    /// Base name of the watermarked file.
    pub name: &'a str,
}

impl fmt::Display for Progress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processing pair {}/{}: {}",
            self.index, self.total, self.name
        )
    }
}

/// Outcome of one repair task.
#[derive(Debug)]
pub struct TaskResult {
    /// Shared pair identifier.
    pub id: String,
    /// Output name (watermarked file's base name).
    pub name: String,
    /// Repaired bytes, or why there are none.
    pub outcome: std::result::Result<Vec<u8>, RepairFailure>,
}

impl TaskResult {
    /// Whether the task produced output.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Human-readable reason for the outcome.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.outcome {
            Ok(_) => SUCCESS_MESSAGE.to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// One report line: `  [SUCCESS|FAILURE] <name> - <reason>`.
    #[must_use]
    pub fn report_line(&self) -> String {
        let tag = if self.is_success() {
            "SUCCESS"
        } else {
            "FAILURE"
        };
        format!("  [{tag}] {} - {}", self.name, self.message())
    }
}

/// Everything a batch run produced.
#[derive(Debug, Default)]
pub struct BatchOutput {
    /// One result per attempted task, in processing order.
    pub results: Vec<TaskResult>,
}

impl BatchOutput {
    /// Successful outputs as `(name, bytes)`.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.results.iter().filter_map(|r| match &r.outcome {
            Ok(bytes) => Some((r.name.as_str(), bytes.as_slice())),
            Err(_) => None,
        })
    }

    /// Number of repaired images.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of failed tasks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Header line followed by one line per task, newline-joined.
    #[must_use]
    pub fn report(&self) -> String {
        std::iter::once(REPORT_HEADER.to_string())
            .chain(self.results.iter().map(TaskResult::report_line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs the repair engine over every pair in a source.
///
/// Holds the shared detector (through the engine) and the run's
/// configuration; both are read-only for the lifetime of the processor.
pub struct BatchProcessor<D> {
    engine: RepairEngine<D>,
    config: RepairConfig,
}

impl<D: Detector> BatchProcessor<D> {
    /// Build a processor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` is out of range.
    pub fn new(detector: D, config: RepairConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: RepairEngine::new(detector),
            config,
        })
    }

    /// The configuration every task uses.
    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    /// The underlying engine.
    pub fn engine(&self) -> &RepairEngine<D> {
        &self.engine
    }

    /// Process every pair found in `source`.
    ///
    /// `progress` is called once before each task.
    ///
    /// # Errors
    ///
    /// - [`Error::NoPairsFound`] if no pair exists; nothing is processed.
    /// - Any error from [`EntrySource::read_entry`].
    pub fn process<S, F>(&self, source: &mut S, mut progress: F) -> Result<BatchOutput>
    where
        S: EntrySource + ?Sized,
        F: FnMut(Progress<'_>),
    {
        let names = source.entry_names();
        let tasks = pairing::discover_tasks(names.iter().map(String::as_str));
        if tasks.is_empty() {
            return Err(Error::NoPairsFound);
        }
        info!(pairs = tasks.len(), entries = names.len(), "starting batch");

        let total = tasks.len();
        let mut output = BatchOutput {
            results: Vec::with_capacity(total),
        };
        for (i, task) in tasks.iter().enumerate() {
            let name = task.output_name();
            let step = Progress {
                index: i + 1,
                total,
                name: &name,
            };
            info!("{step}");
            progress(step);

            let result = self.run_task(source, task, name)?;
            if let Err(e) = &result.outcome {
                warn!(pair = %result.id, reason = %e, "pair failed");
            }
            output.results.push(result);
        }

        info!(
            succeeded = output.succeeded(),
            failed = output.failed(),
            "batch finished"
        );
        Ok(output)
    }

    fn run_task<S>(&self, source: &mut S, task: &RepairTask, name: String) -> Result<TaskResult>
    where
        S: EntrySource + ?Sized,
    {
        let watermarked = source.read_entry(&task.watermarked)?;
        let reference = source.read_entry(&task.reference)?;
        let outcome = self.engine.repair(&watermarked, &reference, &self.config);
        Ok(TaskResult {
            id: task.id.clone(),
            name,
            outcome,
        })
    }
}
