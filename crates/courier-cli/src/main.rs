use courier_core::logging;

mod cli;

use crate::cli::CliCommand;

/// Exit code for errors before the pipeline could run (bad config, missing credentials).
const SETUP_FAILURE: i32 = 2;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; stderr if the state dir is unusable.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    match CliCommand::run_from_args().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("courier error: {:#}", err);
            std::process::exit(SETUP_FAILURE);
        }
    }
}
