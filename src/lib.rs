//! adscope binary support: CLI commands, logging setup and the HTTP API

pub mod cli;
pub mod logging;
pub mod server;
