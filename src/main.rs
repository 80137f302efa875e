use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use glidepath::core::ViewMode;

#[derive(Parser, Debug)]
#[command(
    name = "glidepath",
    about = "Monthly chart reconstruction for Monte Carlo retirement projections"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the reconstruction API over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one reconstruction from a JSON request file and print the response.
    Render {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum, help = "Override the view requested in the file")]
        view: Option<CliViewMode>,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliViewMode {
    Nominal,
    Real,
}

impl From<CliViewMode> for ViewMode {
    fn from(value: CliViewMode) -> Self {
        match value {
            CliViewMode::Nominal => ViewMode::Nominal,
            CliViewMode::Real => ViewMode::Real,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = glidepath::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                process::exit(1);
            }
        }
        Command::Render { input, view } => {
            let payload = match std::fs::read_to_string(&input) {
                Ok(payload) => payload,
                Err(e) => {
                    eprintln!("Failed to read {}: {e}", input.display());
                    process::exit(1);
                }
            };
            match glidepath::api::reconstruct_json(&payload, view.map(ViewMode::from)) {
                Ok(json) => println!("{json}"),
                Err(msg) => {
                    eprintln!("{msg}");
                    process::exit(1);
                }
            }
        }
    }
}
