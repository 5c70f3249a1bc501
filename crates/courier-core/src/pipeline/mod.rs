//! Three-stage report pipeline and its status model.

mod ports;
mod run;
mod status;

pub use ports::{Acquire, Deliver, LogOnlyDelivery, Transform};
pub use run::{day_label, fallback_text, loss_notice, Pipeline, PipelineSettings, StagePolicies};
pub use status::{PipelineStatus, RunReport, RunStatus, Stage, StageFailure};
