//! Wayfarer - decoration scene importer for Journey level data
//!
//! The pipeline: verify and load the native mesh description parser, index
//! the game's asset trees by name, evaluate the scripted scene, and place
//! every resolvable decoration through a host collaborator. The built-in
//! collaborator writes OBJ files; anything that implements
//! [`model::HostScene`] can stand in for it.

use clap::{Parser, Subcommand};
use wayfarer_utils::{ok, AnyResult};

pub mod assets;
pub mod commands;
pub mod config;
pub mod model;
pub mod native;
pub mod pipeline;
pub mod trust;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand)]
pub enum CliCommand {
    /// Imports a decoration scene into a directory of OBJ files
    Import(commands::ImportCommand),
}

pub trait Command {
    fn run(self) -> AnyResult;
}

/// Runs `wayfarer` as if it was ran from the command line.
pub fn run(cli: Cli) -> AnyResult {
    match cli.command {
        CliCommand::Import(c) => c.run()?,
    }
    ok()
}
