//! End-of-run summaries.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use snd_core::Error;

use crate::pool::JobResult;

/// What a successful job amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job wrote `bytes` of output.
    Completed { bytes: u64 },
    /// The job had nothing to do (e.g. the output already exists).
    Skipped { reason: String },
}

/// Maps a job's success value to what the summary counts.
pub trait ToOutcome {
    fn to_outcome(&self) -> JobOutcome;
}

impl ToOutcome for JobOutcome {
    fn to_outcome(&self) -> JobOutcome {
        self.clone()
    }
}

/// A failed job and why.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub job: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub operation: String,
    pub dry_run: bool,
    /// Jobs planned (or, for a dry run, jobs that would run).
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub output_bytes: u64,
    pub elapsed_secs: f64,
    pub finished_at: DateTime<Utc>,
    pub failures: Vec<Failure>,
    pub skipped_items: Vec<String>,
    /// Dry runs only: the command (or change) each job would run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<String>,
    #[serde(skip)]
    started: Instant,
}

impl Summary {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            dry_run: false,
            total: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            output_bytes: 0,
            elapsed_secs: 0.0,
            finished_at: Utc::now(),
            failures: Vec::new(),
            skipped_items: Vec::new(),
            planned: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Record something that was left out before dispatch.
    pub fn skip(&mut self, item: impl Into<String>) {
        self.skipped += 1;
        self.skipped_items.push(item.into());
    }

    /// Record what a dry-run job would do.
    pub fn plan(&mut self, line: impl Into<String>) {
        self.planned.push(line.into());
    }

    /// Record a failure that happened outside the pool (e.g. a probe error
    /// that disqualifies a source).
    pub fn fail(&mut self, job: impl Into<String>, error: &Error) {
        self.failed += 1;
        self.failures.push(Failure {
            job: job.into(),
            error: error.to_string(),
        });
    }

    /// Fold pool results into the counters.
    pub fn add_results<T: ToOutcome>(&mut self, results: &[JobResult<T>]) {
        self.total += results.len();
        for result in results {
            match result.outcome.as_ref().map(ToOutcome::to_outcome) {
                Ok(JobOutcome::Completed { bytes }) => {
                    self.succeeded += 1;
                    self.output_bytes += bytes;
                }
                Ok(JobOutcome::Skipped { reason }) => {
                    self.skip(format!("{}: {reason}", result.label));
                }
                Err(e) => self.fail(&result.label, e),
            }
        }
    }

    /// Stamp the wall time and finish time.
    pub fn finish(mut self) -> Self {
        self.elapsed_secs = self.started.elapsed().as_secs_f64();
        self.finished_at = Utc::now();
        self
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// The error a run with failures exits with.
    pub fn failure_error(&self) -> Option<Error> {
        self.has_failures().then(|| {
            Error::job(
                &self.operation,
                format!("{} of {} jobs failed", self.failed, self.total.max(self.failed)),
            )
        })
    }

    /// Human-readable summary for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.planned {
            out.push_str(line);
            out.push('\n');
        }
        if self.dry_run {
            out.push_str(&format!(
                "{} (dry run): {} jobs planned, {} skipped\n",
                self.operation, self.total, self.skipped
            ));
        } else {
            out.push_str(&format!(
                "{}: {} succeeded, {} failed, {} skipped in {:.1}s ({} written)\n",
                self.operation,
                self.succeeded,
                self.failed,
                self.skipped,
                self.elapsed_secs,
                format_bytes(self.output_bytes)
            ));
        }

        if !self.failures.is_empty() {
            out.push_str("Failed:\n");
            for failure in &self.failures {
                out.push_str(&format!("  {}: {}\n", failure.job, failure.error));
            }
        }
        if !self.skipped_items.is_empty() {
            out.push_str("Skipped:\n");
            for item in &self.skipped_items {
                out.push_str(&format!("  {item}\n"));
            }
        }
        out
    }
}

/// Format a byte count with binary units (`512 B`, `1.5 MiB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn result(id: usize, outcome: snd_core::Result<JobOutcome>) -> JobResult<JobOutcome> {
        JobResult {
            id,
            label: format!("job{id}"),
            outcome,
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(1_572_864), "1.5 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn results_are_counted() {
        let mut summary = Summary::new("encode");
        summary.skip("mp3 448k: outside the encoder range (8-320 kbps)");
        summary.add_results(&[
            result(1, Ok(JobOutcome::Completed { bytes: 2048 })),
            result(2, Ok(JobOutcome::Skipped { reason: "output exists".into() })),
            result(3, Err(Error::job("job3", "ffmpeg exited with status 1"))),
        ]);
        let summary = summary.finish();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.output_bytes, 2048);
        assert!(summary.skipped_items[1].starts_with("job2: output exists"));

        let text = summary.render();
        assert!(text.starts_with("encode: 1 succeeded, 1 failed, 2 skipped"));
        assert!(text.contains("(2.0 KiB written)"));
        assert!(text.contains("Failed:\n  job3: "));

        let err = summary.failure_error().unwrap();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("1 of 3 jobs failed"));
    }

    #[test]
    fn clean_run_has_no_failure_error() {
        let mut summary = Summary::new("hls");
        summary.add_results(&[result(1, Ok(JobOutcome::Completed { bytes: 1 }))]);
        assert!(summary.failure_error().is_none());
    }

    #[test]
    fn dry_run_render_and_json() {
        let mut summary = Summary::new("fix-artists");
        summary.dry_run = true;
        summary.total = 1;
        summary.plan("/music/a.flac: artist \"VA\" -> \"A\"");
        let summary = summary.finish();
        assert_eq!(
            summary.render(),
            "/music/a.flac: artist \"VA\" -> \"A\"\nfix-artists (dry run): 1 jobs planned, 0 skipped\n"
        );

        let json: serde_json::Value = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["operation"], "fix-artists");
        assert_eq!(json["dry_run"], true);
        assert!(json.get("started").is_none());
        assert!(json["finished_at"].is_string());
        assert_eq!(json["planned"][0], "/music/a.flac: artist \"VA\" -> \"A\"");

        let real = Summary::new("encode").finish();
        let json = serde_json::to_value(&real).unwrap();
        assert!(json.get("planned").is_none());
    }
}
