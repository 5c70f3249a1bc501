//! CLI command handlers, one file per command.

mod checksum;
mod fallback;
mod run;

pub use checksum::run_checksum;
pub use fallback::{
    run_fallback_list, run_fallback_remove, run_fallback_resend, run_fallback_show,
    run_fallback_verify,
};
pub use run::run_pipeline;
