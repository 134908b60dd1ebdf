//! folio CLI
//!
//! Command-line interface for the folio page store

use clap::{Parser, Subcommand};

mod commands;

use commands::GlobalArgs;

#[derive(Debug, Parser)]
#[command(name = "folio")]
#[command(about = "folio - Versioned page content", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Page draft operations
    Page(commands::page::PageArgs),
    /// Render a page as hydrated JSON
    Render(commands::render::RenderArgs),
    /// Version operations (publish, list, compare, ...)
    Version(commands::version::VersionArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = commands::Session::open(&cli.global).and_then(|mut session| match cli.command {
        Commands::Page(args) => commands::page::execute(args, &mut session),
        Commands::Render(args) => commands::render::execute(args, &session),
        Commands::Version(args) => commands::version::execute(args, &mut session),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
