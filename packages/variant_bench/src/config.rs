//! Harness configuration: defaults, the settings file and environment overrides.

use std::fmt;
use std::fs;
use std::io;
use std::num::NonZero;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use new_zealand::nz;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the maximum measured time, in seconds.
pub const MAX_TIME_ENV: &str = "VARIANT_BENCH_MAX_TIME";

/// Environment variable overriding the worker thread count of parallel variants.
pub const NUM_THREADS_ENV: &str = "VARIANT_BENCH_NUM_THREADS";

/// Which family of variants a run is restricted to.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum TasksType {
    /// No restriction beyond what the runtime supports.
    #[default]
    Unrestricted,

    /// Thread-based runs. Distributed variants are excluded even if a runtime is active.
    Threads,

    /// Process-based runs. Of the non-distributed variants only the sequential one is kept
    /// as the baseline.
    Processes,
}

impl TasksType {
    /// The settings value, or `None` for [`Unrestricted`][Self::Unrestricted].
    #[must_use]
    pub fn as_setting(self) -> Option<&'static str> {
        match self {
            Self::Unrestricted => None,
            Self::Threads => Some("threads"),
            Self::Processes => Some("processes"),
        }
    }
}

impl fmt::Display for TasksType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_setting().unwrap_or(""))
    }
}

impl FromStr for TasksType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Ok(Self::Unrestricted),
            "threads" => Ok(Self::Threads),
            "processes" => Ok(Self::Processes),
            _ => Err(format!(
                "Invalid tasks type: '{s}'. Valid options are: threads, processes or empty"
            )),
        }
    }
}

/// Errors from assembling a [`HarnessConfig`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings file {}", path.display())]
    Read {
        /// The settings file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The settings file is not valid TOML or has fields of the wrong type.
    #[error("cannot parse settings file {}", path.display())]
    Parse {
        /// The settings file.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// A setting has a value outside its domain.
    #[error("invalid value '{value}' for {setting}: {problem}")]
    InvalidValue {
        /// The setting or environment variable.
        setting: String,
        /// The rejected value.
        value: String,
        /// A human-readable description of the problem.
        problem: String,
    },
}

pub(crate) type Result<T> = std::result::Result<T, ConfigError>;

/// On-disk shape of the settings file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    tasks_type: Option<String>,
    max_time: Option<f64>,
    repetitions: Option<u32>,
}

/// Everything that parameterizes a measurement run.
///
/// Built from [`Default`] and refined with the settings file, environment variables and
/// command line options, in that order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HarnessConfig {
    max_time: Duration,
    repetitions: NonZero<u32>,
    tasks_type: TasksType,
    worker_threads: NonZero<usize>,
    root_marker: String,
    perf_marker: String,
}

impl HarnessConfig {
    /// Default maximum measured time.
    pub const DEFAULT_MAX_TIME: Duration = Duration::from_secs(10);

    /// Loads the settings file at `path`, if any, on top of the defaults.
    ///
    /// A settings file that does not exist is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds an invalid value.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::default();

        let Some(path) = path else {
            return Ok(config);
        };

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "settings file not found, using defaults");
                return Ok(config);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let settings: Settings =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.apply_settings(settings)
    }

    fn apply_settings(mut self, settings: Settings) -> Result<Self> {
        if let Some(value) = settings.tasks_type {
            self.tasks_type = value
                .parse()
                .map_err(|problem| invalid("tasks_type", &value, problem))?;
        }

        if let Some(secs) = settings.max_time {
            self.max_time = parse_max_time("max_time", &secs.to_string())?;
        }

        if let Some(repetitions) = settings.repetitions {
            self.repetitions = NonZero::new(repetitions).ok_or_else(|| {
                invalid("repetitions", "0", "must be at least 1".to_owned())
            })?;
        }

        Ok(self)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// Honors [`MAX_TIME_ENV`] and [`NUM_THREADS_ENV`].
    ///
    /// # Errors
    ///
    /// Returns an error if an override is set to an invalid value.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(MAX_TIME_ENV) {
            self.max_time = parse_max_time(MAX_TIME_ENV, &value)?;
        }

        if let Some(value) = lookup(NUM_THREADS_ENV) {
            self.worker_threads = value
                .trim()
                .parse::<NonZero<usize>>()
                .map_err(|e| invalid(NUM_THREADS_ENV, &value, e.to_string()))?;
        }

        Ok(self)
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is set to an invalid value.
    pub fn apply_process_env(self) -> Result<Self> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    /// Sets the maximum measured time.
    #[must_use]
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = max_time;
        self
    }

    /// Sets the repetition count.
    #[must_use]
    pub fn with_repetitions(mut self, repetitions: NonZero<u32>) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Sets the tasks type.
    #[must_use]
    pub fn with_tasks_type(mut self, tasks_type: TasksType) -> Self {
        self.tasks_type = tasks_type;
        self
    }

    /// Sets the worker thread count given to parallel variants.
    #[must_use]
    pub fn with_worker_threads(mut self, worker_threads: NonZero<usize>) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    /// Sets the path components that delimit report identifiers.
    #[must_use]
    pub fn with_markers(mut self, root_marker: &str, perf_marker: &str) -> Self {
        root_marker.clone_into(&mut self.root_marker);
        perf_marker.clone_into(&mut self.perf_marker);
        self
    }

    /// Measurements longer than this are errors.
    #[must_use]
    pub fn max_time(&self) -> Duration {
        self.max_time
    }

    /// How many times the timed phases are repeated.
    #[must_use]
    pub fn repetitions(&self) -> NonZero<u32> {
        self.repetitions
    }

    /// Which family of variants is eligible.
    #[must_use]
    pub fn tasks_type(&self) -> TasksType {
        self.tasks_type
    }

    /// How many worker threads parallel variants use.
    #[must_use]
    pub fn worker_threads(&self) -> NonZero<usize> {
        self.worker_threads
    }

    /// The path component after which report identifiers start.
    #[must_use]
    pub fn root_marker(&self) -> &str {
        &self.root_marker
    }

    /// The path component before which report identifiers end.
    #[must_use]
    pub fn perf_marker(&self) -> &str {
        &self.perf_marker
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_time: Self::DEFAULT_MAX_TIME,
            repetitions: nz!(1),
            tasks_type: TasksType::Unrestricted,
            worker_threads: thread::available_parallelism().unwrap_or(nz!(1)),
            root_marker: "tasks".to_owned(),
            perf_marker: "perf".to_owned(),
        }
    }
}

fn parse_max_time(setting: &str, value: &str) -> Result<Duration> {
    let secs = value
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(setting, value, e.to_string()))?;

    if secs <= 0.0 {
        return Err(invalid(setting, value, "must be positive".to_owned()));
    }

    Duration::try_from_secs_f64(secs).map_err(|e| invalid(setting, value, e.to_string()))
}

fn invalid(setting: &str, value: &str, problem: String) -> ConfigError {
    ConfigError::InvalidValue {
        setting: setting.to_owned(),
        value: value.to_owned(),
        problem,
    }
}
