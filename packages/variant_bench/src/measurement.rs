use std::fmt;
use std::num::NonZero;
use std::str::FromStr;
use std::time::Duration;

use new_zealand::nz;

/// Which phases of a task the timed region encloses.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum PerfMode {
    /// Every repetition is a whole episode: validate, pre-process, run, post-process.
    #[default]
    Pipeline,

    /// Only the run phase is timed; setup and post-processing happen once, untimed.
    TaskRun,

    /// No measurement was taken. Valid as a tag, rejected as a mode to measure in.
    None,
}

impl PerfMode {
    /// The modes that can actually be measured.
    pub const MEASURABLE: [Self; 2] = [Self::Pipeline, Self::TaskRun];
}

impl fmt::Display for PerfMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pipeline => "pipeline",
            Self::TaskRun => "task_run",
            Self::None => "none",
        })
    }
}

impl FromStr for PerfMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pipeline" => Ok(Self::Pipeline),
            "task_run" | "task-run" => Ok(Self::TaskRun),
            "none" => Ok(Self::None),
            _ => Err(format!(
                "Invalid performance mode: '{s}'. Valid options are: pipeline, task_run, none"
            )),
        }
    }
}

/// Parameters of one measurement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PerfAttr {
    repetitions: NonZero<u32>,
    mode: PerfMode,
}

impl PerfAttr {
    /// Creates measurement parameters.
    #[must_use]
    pub fn new(repetitions: NonZero<u32>, mode: PerfMode) -> Self {
        Self { repetitions, mode }
    }

    /// How many times the timed phases are repeated.
    #[must_use]
    pub fn repetitions(&self) -> NonZero<u32> {
        self.repetitions
    }

    /// Which phases are timed.
    #[must_use]
    pub fn mode(&self) -> PerfMode {
        self.mode
    }
}

impl Default for PerfAttr {
    fn default() -> Self {
        Self::new(nz!(1), PerfMode::Pipeline)
    }
}

/// The result of one measurement. Immutable once created.
///
/// The elapsed time is the total over all repetitions, not an average.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PerfMeasurement {
    mode: PerfMode,
    elapsed: Duration,
    repetitions: NonZero<u32>,
}

impl PerfMeasurement {
    pub(crate) fn new(mode: PerfMode, elapsed: Duration, repetitions: NonZero<u32>) -> Self {
        Self {
            mode,
            elapsed,
            repetitions,
        }
    }

    /// The mode the measurement was taken in.
    #[must_use]
    pub fn mode(&self) -> PerfMode {
        self.mode
    }

    /// Total elapsed time of the timed region.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Total elapsed time of the timed region, in seconds.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// How many repetitions the timed region covered.
    #[must_use]
    pub fn repetitions(&self) -> NonZero<u32> {
        self.repetitions
    }
}

/// `mode:seconds` with exactly 10 decimals.
impl fmt::Display for PerfMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:.10}", self.mode, self.elapsed_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_its_own_display() {
        for mode in [PerfMode::Pipeline, PerfMode::TaskRun, PerfMode::None] {
            assert_eq!(mode.to_string().parse::<PerfMode>(), Ok(mode));
        }
    }

    #[test]
    fn mode_parse_is_case_insensitive() {
        assert_eq!("PIPELINE".parse::<PerfMode>(), Ok(PerfMode::Pipeline));
        assert_eq!("Task-Run".parse::<PerfMode>(), Ok(PerfMode::TaskRun));
    }

    #[test]
    fn mode_parse_rejects_unknown() {
        let err = "fastest".parse::<PerfMode>().unwrap_err();
        assert!(err.contains("fastest"));
    }

    #[test]
    fn measurement_formats_ten_decimals() {
        let measurement =
            PerfMeasurement::new(PerfMode::TaskRun, Duration::from_nanos(1_234_567), nz!(3));

        assert_eq!(measurement.to_string(), "task_run:0.0012345670");
        assert_eq!(measurement.repetitions().get(), 3);
    }

    #[test]
    fn elapsed_secs_keeps_nanoseconds() {
        let measurement =
            PerfMeasurement::new(PerfMode::Pipeline, Duration::from_nanos(1), nz!(1));

        assert!((measurement.elapsed_secs() - 1e-9).abs() < 1e-15);
    }

    #[test]
    fn default_attr_is_single_pipeline_repetition() {
        let attr = PerfAttr::default();

        assert_eq!(attr.mode(), PerfMode::Pipeline);
        assert_eq!(attr.repetitions().get(), 1);
    }
}
