//! Where measurements and measurement errors go.

use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::{MeasureError, PerfMeasurement};

/// Receives the outcome of measurements.
///
/// The runner calls the reporter at most once per measurement and only on the primary rank.
pub trait Reporter: Send + Sync {
    /// Records a successful measurement.
    fn report(&self, identifier: &str, measurement: &PerfMeasurement);

    /// Records a measurement that failed.
    fn report_error(&self, identifier: &str, error: &MeasureError);
}

/// Writes one `identifier:mode:seconds` line per measurement, seconds with 10 decimals.
///
/// Errors go to a separate writer so that the measurement stream only carries results.
pub struct LineReporter {
    out: Mutex<Box<dyn Write + Send>>,
    err: Mutex<Box<dyn Write + Send>>,
}

impl LineReporter {
    /// Creates a reporter writing results to `out` and errors to `err`.
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    /// Creates a reporter writing results to stdout and errors to stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    fn write_line(target: &Mutex<Box<dyn Write + Send>>, line: &str) {
        let mut target = target.lock().unwrap_or_else(PoisonError::into_inner);

        if let Err(e) = writeln!(target, "{line}").and_then(|()| target.flush()) {
            tracing::warn!(error = %e, "failed to write report line");
        }
    }
}

impl Reporter for LineReporter {
    fn report(&self, identifier: &str, measurement: &PerfMeasurement) {
        Self::write_line(&self.out, &format!("{identifier}:{measurement}"));
    }

    fn report_error(&self, identifier: &str, error: &MeasureError) {
        Self::write_line(&self.err, &format!("{identifier}: {error}"));
    }
}

impl std::fmt::Debug for LineReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineReporter").finish_non_exhaustive()
    }
}

/// One call received by a [`CollectingReporter`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ReportEntry {
    /// A [`Reporter::report()`] call.
    Measurement {
        /// The identifier the measurement was reported under.
        identifier: String,
        /// The measurement.
        measurement: PerfMeasurement,
    },

    /// A [`Reporter::report_error()`] call.
    Error {
        /// The identifier the error was reported under.
        identifier: String,
        /// The error.
        error: MeasureError,
    },
}

/// Keeps every report in memory, in call order.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    entries: Mutex<Vec<ReportEntry>>,
}

impl CollectingReporter {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything reported so far.
    #[must_use]
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The successful measurements reported so far.
    #[must_use]
    pub fn measurements(&self) -> Vec<(String, PerfMeasurement)> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                ReportEntry::Measurement {
                    identifier,
                    measurement,
                } => Some((identifier, measurement)),
                ReportEntry::Error { .. } => None,
            })
            .collect()
    }

    /// The errors reported so far.
    #[must_use]
    pub fn errors(&self) -> Vec<(String, MeasureError)> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                ReportEntry::Error { identifier, error } => Some((identifier, error)),
                ReportEntry::Measurement { .. } => None,
            })
            .collect()
    }

    fn push(&self, entry: ReportEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, identifier: &str, measurement: &PerfMeasurement) {
        self.push(ReportEntry::Measurement {
            identifier: identifier.to_owned(),
            measurement: *measurement,
        });
    }

    fn report_error(&self, identifier: &str, error: &MeasureError) {
        self.push(ReportEntry::Error {
            identifier: identifier.to_owned(),
            error: error.clone(),
        });
    }
}

/// Derives a report identifier from the source path of a performance test.
///
/// The identifier is the run of path components after the last `root_marker` component and
/// before the first component named `perf_marker` (with or without extension). For
/// `src/tasks/sum_elements/perf.rs` with markers `tasks` and `perf` that is `sum_elements`.
///
/// If either marker is missing, or nothing lies between them, the file stem is used.
#[must_use]
pub fn derive_identifier(source: &str, root_marker: &str, perf_marker: &str) -> String {
    let components = source
        .split(['/', '\\'])
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>();

    let between = components
        .iter()
        .rposition(|c| *c == root_marker)
        .and_then(|root| {
            let rest = components.get(root.saturating_add(1)..)?;
            let end = rest.iter().position(|c| component_stem(c) == perf_marker)?;
            rest.get(..end).filter(|parts| !parts.is_empty())
        });

    match between {
        Some(parts) => parts.join("/"),
        None => Path::new(source)
            .file_stem()
            .map_or_else(|| source.to_owned(), |s| s.to_string_lossy().into_owned()),
    }
}

fn component_stem(component: &str) -> &str {
    component
        .split_once('.')
        .map_or(component, |(stem, _)| stem)
}
