use crate::demo::{run_demo, DemoArgs};
use crate::export::{run_export, ExportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use smart_kyc::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Smart KYC",
    about = "Run and demonstrate the identity-verification workflow from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect stored applications
    Applications {
        #[command(subcommand)]
        command: ApplicationsCommand,
    },
    /// Walk one application through the workflow with simulated analyzers
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ApplicationsCommand {
    /// Write a CSV status report of every stored application
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Applications {
            command: ApplicationsCommand::Export(args),
        } => run_export(args),
        Command::Demo(args) => run_demo(args),
    }
}
