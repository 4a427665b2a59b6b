use clap::Parser;
use tracing::{debug, error, trace};

use ytdlp_supervisor::cli::{get_log_level, run_download, run_info, Cli, Commands};
use ytdlp_supervisor::config::ConfigLoader;
use ytdlp_supervisor::{runtime, Supervisor, SupervisorError};

/// Exit status for an invocation canceled by Ctrl-C
const EXIT_CANCELED: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(get_log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("ytdlp-supervisor started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli).await {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        let canceled = e
            .downcast_ref::<SupervisorError>()
            .is_some_and(SupervisorError::is_canceled);
        std::process::exit(if canceled { EXIT_CANCELED } else { 1 });
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConfigLoader::load(cli.config.as_deref()).await?;
    runtime::init(&config)?;
    let supervisor = Supervisor::new();

    match cli.command {
        Commands::Download(args) => {
            let result = run_download(&supervisor, args).await?;
            debug!("Command: {}", result.command.join(" "));
        }
        Commands::Info { url, compact } => {
            println!("{}", run_info(&supervisor, &url, compact).await?);
        }
    }
    Ok(())
}
