#![forbid(unsafe_code)]

pub mod chapters;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod extract;
pub mod formats;
pub mod http;
pub mod logging;
pub mod manifest;
pub mod mirror;
pub mod progress;
pub mod queue;
pub mod sequence;
pub mod site;
pub mod store;
pub mod worker;

#[cfg(test)]
mod testing;
