use crate::demo::{run_demo, run_link_show, DemoArgs, LinkShowArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use vagafacil::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "VagaFacil Disclosure",
    about = "Run and exercise the VagaFacil candidate disclosure workflow",
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
    /// Inspect links through a running disclosure API
    Link {
        #[command(subcommand)]
        command: LinkCommand,
    },
    /// Walk the interest/response handshake against an in-process server
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum LinkCommand {
    /// Fetch one link as a given viewer and print the role-filtered view
    Show(LinkShowArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Start without the sample links
    #[arg(long)]
    pub(crate) no_seed: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Link {
            command: LinkCommand::Show(args),
        } => run_link_show(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
