//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - develop: iterate on code until its tests pass
//! - pentest: run an assessment against a target host
//! - probe: check which reasoning-service host answers

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// agentloop - an iterative agent loop driven by a local reasoning service
#[derive(Parser, Debug)]
#[command(name = "agentloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Model to use instead of the configured one
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Iteration budget instead of the configured one
    #[arg(short = 'n', long, global = true)]
    pub max_iterations: Option<u32>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate code and tests until the tests pass
    Develop {
        /// Task description; prompted for when omitted
        task: Option<String>,
    },

    /// Assess a target host with allow-listed tools
    Pentest {
        /// Target host; prompted for when omitted
        target: Option<String>,

        /// Target port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check connectivity to the reasoning service
    Probe,
}
