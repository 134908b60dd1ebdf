//! Page draft commands

use std::path::PathBuf;

use clap::{Args, Subcommand};
use folio_engine::{apply_engine_command, EngineCommand};

use super::{print_json, CliResult, Session};

#[derive(Debug, Args)]
pub struct PageArgs {
    #[command(subcommand)]
    pub command: PageCommand,
}

#[derive(Debug, Subcommand)]
pub enum PageCommand {
    /// Replace a page's draft from a YAML or JSON definition file
    Import {
        /// Definition file (`.json` is read as JSON, anything else as YAML)
        file: PathBuf,
    },
}

pub fn execute(args: PageArgs, session: &mut Session) -> CliResult {
    match args.command {
        PageCommand::Import { file } => {
            let result = apply_engine_command(
                EngineCommand::ImportPage { path: file },
                &mut session.conn,
                &session.ctx,
            )?;
            print_json(&result)
        }
    }
}
