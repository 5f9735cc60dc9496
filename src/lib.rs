#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod detail;
pub mod extract;
pub mod formats;
pub mod graph;
pub mod harvest;
pub mod keywords;
pub mod logging;
