use crate::demo::{run_availability, run_demo, AvailabilityArgs, DemoArgs};
use crate::server;
use boatiesmate::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "BoatiesMate",
    about = "Run the BoatiesMate mooring booking service or explore it from the command line",
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
    /// Search the demo marinas for free, suitable moorings
    Availability(AvailabilityArgs),
    /// Walk through compliance, booking, and approval against seeded marinas
    Demo(DemoArgs),
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
        Command::Availability(args) => run_availability(args),
        Command::Demo(args) => run_demo(args),
    }
}
