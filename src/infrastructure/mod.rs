// Infrastructure: process setup and the recorded-snapshot symbol source.

pub mod concurrency;
pub mod config;
pub mod logging;
pub mod snapshot;
