pub mod config;
pub mod git;
pub mod logging;
pub mod server;
