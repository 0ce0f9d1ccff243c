use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use evalhv_lib::settings::ENDPOINT_ENV;
use evalhv_lib::{load_settings, save_settings, HeadlessSubmit};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a CV and print the analysis result.
    Submit {
        #[clap(long)]
        name: String,
        #[clap(long)]
        chapter: String,
        #[clap(long)]
        role: String,
        /// The CV to upload, usually a PDF.
        #[clap(long)]
        document: Option<PathBuf>,
        /// Overrides the configured endpoint.
        #[clap(long, env = ENDPOINT_ENV)]
        endpoint: Option<String>,
        /// Print the output region as HTML instead of plain text.
        #[clap(long)]
        html: bool,
    },
    /// Inspect or change the stored settings.
    Config {
        #[clap(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    Show,
    SetEndpoint { url: String },
    SetReportDir { dir: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Submit {
            name,
            chapter,
            role,
            document,
            endpoint,
            html,
        } => {
            evalhv_lib::submit_headless(HeadlessSubmit {
                name,
                chapter,
                role,
                document,
                endpoint,
                html,
            })
            .await
        }
        Commands::Config { command } => run_config(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_config(command: ConfigCommand) -> Result<(), String> {
    let mut settings = load_settings();
    match command {
        ConfigCommand::Show => {
            let json = serde_json::to_string_pretty(&settings).map_err(|e| e.to_string())?;
            println!("{}", json);
            Ok(())
        }
        ConfigCommand::SetEndpoint { url } => {
            // Reject garbage before it lands on disk.
            settings
                .resolve_endpoint(Some(&url))
                .map_err(|e| e.to_string())?;
            settings.endpoint = Some(url);
            save_settings(&settings)
        }
        ConfigCommand::SetReportDir { dir } => {
            settings.report_dir = Some(dir.to_string_lossy().to_string());
            save_settings(&settings)
        }
    }
}
