//! tdat - Thread dump analyzer
//!
//! This library turns thread dump captures and optional per-thread CPU usage
//! samples into a per-thread history across dumps: identity, state and stack
//! at each capture, CPU cost over time, pool labels and risk findings.

pub mod aggregator;
pub mod classify;
pub mod cli;
pub mod correlate;
pub mod dump_parser;
pub mod pools;
pub mod report;
pub mod rules;
pub mod session;
pub mod thread;
pub mod usage_parser;
