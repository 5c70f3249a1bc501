pub mod config;
pub mod logging;

pub mod audit;
pub mod batch;
pub mod checksum;
pub mod fallback;
pub mod http;
pub mod item;
pub mod pipeline;
pub mod retry;
pub mod source;
