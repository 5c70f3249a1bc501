//! Per-run stage status and the process exit contract.

use std::fmt;
use std::path::PathBuf;

/// The three ordered stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquisition,
    Transformation,
    Delivery,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Acquisition => "acquisition",
            Stage::Transformation => "transformation",
            Stage::Delivery => "delivery",
        };
        f.write_str(s)
    }
}

/// Which stages succeeded. Flags only ever go from false to true.
///
/// `used_fallback_text` is tracked separately from `transformation_ok`: when
/// the inference call fails the run continues with a placeholder text, the
/// flag is set, and `transformation_ok` stays false so the run still counts
/// as a total failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStatus {
    acquisition_ok: bool,
    transformation_ok: bool,
    delivery_ok: bool,
    used_fallback_text: bool,
}

impl PipelineStatus {
    pub fn acquisition_ok(&self) -> bool {
        self.acquisition_ok
    }

    pub fn transformation_ok(&self) -> bool {
        self.transformation_ok
    }

    pub fn delivery_ok(&self) -> bool {
        self.delivery_ok
    }

    pub fn used_fallback_text(&self) -> bool {
        self.used_fallback_text
    }

    pub(crate) fn mark_acquired(&mut self) {
        self.acquisition_ok = true;
    }

    pub(crate) fn mark_transformed(&mut self) {
        self.transformation_ok = true;
    }

    pub(crate) fn mark_delivered(&mut self) {
        self.delivery_ok = true;
    }

    pub(crate) fn mark_fallback_text(&mut self) {
        self.used_fallback_text = true;
    }

    /// Aggregate the stage flags into the run verdict.
    pub fn run_status(&self) -> RunStatus {
        if !self.acquisition_ok || !self.transformation_ok {
            RunStatus::TotalFailure
        } else if !self.delivery_ok {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Success
        }
    }
}

/// Final verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every stage succeeded.
    Success,
    /// Output was produced but final delivery failed; a fallback bundle exists.
    PartialSuccess,
    /// No usable output: acquisition or the inference call failed.
    TotalFailure,
}

impl RunStatus {
    /// Process exit code: 0 success, 1 partial success, 2 total failure.
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::PartialSuccess => 1,
            RunStatus::TotalFailure => 2,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Success => "success",
            RunStatus::PartialSuccess => "partial success",
            RunStatus::TotalFailure => "total failure",
        };
        f.write_str(s)
    }
}

/// A stage failure recorded during the run, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

/// Everything the caller learns from one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub status: PipelineStatus,
    /// Text that was (or would have been) delivered.
    pub text: Option<String>,
    /// 1-based indexes of batches whose delivery was given up.
    pub lost_batches: Vec<usize>,
    pub delivered_batches: usize,
    /// Bundle written because text delivery failed.
    pub fallback_path: Option<PathBuf>,
    pub failures: Vec<StageFailure>,
}

impl RunReport {
    pub fn run_status(&self) -> RunStatus {
        self.status.run_status()
    }

    pub fn exit_code(&self) -> i32 {
        self.run_status().exit_code()
    }

    pub(crate) fn fail(&mut self, stage: Stage, message: impl Into<String>) {
        self.failures.push(StageFailure {
            stage,
            message: message.into(),
        });
    }
}
