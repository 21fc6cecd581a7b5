//! End-to-end export run.
//!
//! ```text
//! Session → Fetch → Extract → {File | Database}
//! ```
//!
//! A run moves through `Init → Fetching → Extracted → Persisting → Done`.
//! Writing the raw response as JSON skips extraction: the write happens while
//! still `Fetching` and the run goes straight to `Done`, so a failed write is
//! reported at `Fetching`. Any error moves the run to `Failed` and is
//! reported together with the state it happened in.
//!
//! # Example
//!
//! ```ignore
//! use analytics_export::pipeline::Pipeline;
//!
//! let pipeline = Pipeline::new(Box::new(provider), Box::new(client), destination);
//! let summary = pipeline.run(&DateRange::parse("2023-01-01", "2023-01-31")?).await?;
//! println!("{} records saved to {}", summary.records, summary.destination);
//! ```

use std::fmt;

use crate::auth::SessionProvider;
use crate::config::Destination;
use crate::error::Error;
use crate::report::{extract_all, DateRange, ReportSource};
use crate::sink::{self, FileFormat, FileSource};

/// States of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Fetching,
    Extracted,
    Persisting,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Init => "init",
            RunState::Fetching => "fetching",
            RunState::Extracted => "extracted",
            RunState::Persisting => "persisting",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed run: the error and the state the run was in when it happened.
#[derive(Debug, thiserror::Error)]
#[error("export failed while {stage}: {source}")]
pub struct PipelineError {
    pub stage: RunState,
    #[source]
    pub source: Error,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Where the output went (credentials omitted).
    pub destination: String,
    /// Rows written (for raw JSON, rows contained in the response).
    pub records: usize,
    /// Final state; always `Done`.
    pub state: RunState,
    /// Every state the run entered, starting with `Init`.
    pub transitions: Vec<RunState>,
}

/// State tracking for one run.
#[derive(Debug)]
struct Run {
    state: RunState,
    transitions: Vec<RunState>,
}

impl Run {
    fn new() -> Self {
        Self {
            state: RunState::Init,
            transitions: vec![RunState::Init],
        }
    }

    fn advance(&mut self, next: RunState) {
        tracing::info!(from = %self.state, to = %next, "pipeline transition");
        self.state = next;
        self.transitions.push(next);
    }

    fn fail(&mut self, source: Error) -> PipelineError {
        let stage = self.state;
        tracing::error!(stage = %stage, error = %source, "pipeline failed");
        self.state = RunState::Failed;
        self.transitions.push(RunState::Failed);
        PipelineError { stage, source }
    }
}

/// Sequences session, fetch, extraction and persistence for one destination.
pub struct Pipeline {
    sessions: Box<dyn SessionProvider>,
    source: Box<dyn ReportSource>,
    destination: Destination,
}

impl Pipeline {
    pub fn new(
        sessions: Box<dyn SessionProvider>,
        source: Box<dyn ReportSource>,
        destination: Destination,
    ) -> Self {
        Self {
            sessions,
            source,
            destination,
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Export the report for `range`.
    ///
    /// Nothing is retried; the first error ends the run.
    pub async fn run(&self, range: &DateRange) -> Result<RunSummary, PipelineError> {
        let mut run = Run::new();
        tracing::info!(range = %range, destination = %self.destination, "starting export");

        match self.execute(&mut run, range).await {
            Ok(records) => {
                run.advance(RunState::Done);
                Ok(RunSummary {
                    destination: self.destination.to_string(),
                    records,
                    state: run.state,
                    transitions: run.transitions,
                })
            }
            Err(e) => Err(run.fail(e)),
        }
    }

    async fn execute(&self, run: &mut Run, range: &DateRange) -> Result<usize, Error> {
        run.advance(RunState::Fetching);
        let session = self.sessions.session().await?;
        let response = self.source.fetch(&session, range).await?;

        if let Destination::File {
            format: FileFormat::Json,
            path,
        } = &self.destination
        {
            return sink::write_file(FileSource::Raw(&response), FileFormat::Json, path);
        }

        let records = extract_all(&response)?;
        run.advance(RunState::Extracted);
        tracing::debug!(records = records.len(), "rows extracted");

        run.advance(RunState::Persisting);
        match &self.destination {
            Destination::File { format, path } => {
                sink::write_file(FileSource::Records(&records), *format, path)?;
            }
            Destination::Database(config) => {
                sink::persist(&records, config).await?;
            }
        }
        Ok(records.len())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}
