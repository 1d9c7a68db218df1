//! Binary text classification: CSV splits, an ELMo sentence embedder
//! written as a Burn module, a dense head, best-only checkpointing and
//! a held-out classification report.
#![recursion_limit = "256"]

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
