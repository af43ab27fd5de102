//! # tractflow
//!
//! Command-line front end for [`tractflow_core`]. The binary in `main.rs`
//! only sets up logging and hands the parsed [`cli::Cli`] to
//! [`cli::execute`].

pub mod cli;
