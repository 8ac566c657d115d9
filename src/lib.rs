pub mod candidate;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod inserter;
pub mod pipeline;
pub mod rename;
pub mod report;
pub mod scanner;
pub mod util;
