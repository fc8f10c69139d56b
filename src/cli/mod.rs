//! CLI module for Chainport

pub mod serve;

use clap::{Parser, Subcommand};

/// Chainport - compile instruction chains into callable endpoints
#[derive(Parser)]
#[command(name = "chainport")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,
}
