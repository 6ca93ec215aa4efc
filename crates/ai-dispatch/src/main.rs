//! AI Dispatch entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use ai_dispatch::app::{self, AppError};
use ai_dispatch::cli::{Cli, Commands};
use dispatch_core::DispatchConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));
    fmt().with_env_filter(filter).with_target(false).init();

    if let Err(e) = execute(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn execute(cli: &Cli) -> Result<(), AppError> {
    DispatchConfig::load_env_file(&cli.env_file)?;

    match cli.command() {
        Commands::Run {
            host,
            hook_port,
            webhook_port,
        } => {
            let mut config = DispatchConfig::from_env()?;
            if let Some(port) = hook_port {
                config.hook_port = port;
            }
            if let Some(port) = webhook_port {
                config.webhook_port = port;
            }
            config.validate()?;
            app::run(config, &host).await
        }
        Commands::Check => {
            let config = DispatchConfig::from_env()?;
            print!("{}", app::describe(&config));
            Ok(())
        }
        Commands::InstallHooks { settings, port } => {
            let port = match port {
                Some(port) => port,
                None => std::env::var("HOOK_SERVER_PORT")
                    .ok()
                    .and_then(|p| p.trim().parse().ok())
                    .unwrap_or(8081),
            };
            let path = app::install_hooks(settings, port)?;
            println!("Hooks installed in {}", path.display());
            Ok(())
        }
    }
}
