use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use crate::auth::Permission;
use crate::config::AppConfig;
use crate::database::seed;
use crate::server::{self, StartupError};

#[derive(Parser)]
#[command(name = "doka-api")]
#[command(about = "REST backend for forms, subscriptions and subscriber links")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to bind, overrides APP_PORT")]
        port: Option<u16>,
    },

    #[command(about = "Create tables and seed groups, permissions and the admin account")]
    Seed {
        #[arg(long, help = "Drop and recreate all tables first")]
        reset: bool,
    },

    #[command(about = "Print the permission catalog")]
    Permissions,
}

pub async fn run(cli: Cli) -> Result<(), StartupError> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let mut config = AppConfig::from_env()?;
            if let Some(port) = port {
                config.api.port = port;
            }
            tracing::info!("Starting {} in {:?} mode", config.api.name, config.environment);

            let listener = TcpListener::bind(config.bind_addr()).await?;
            let state = server::build_state(config).await?;
            server::serve(listener, state).await
        }
        Commands::Seed { reset } => {
            let config = AppConfig::from_env()?;
            let store = server::open_store(&config, reset).await?;
            let summary = seed::run(&*store, config.seed.admin.as_ref(), config.security.bcrypt_cost).await?;
            println!(
                "Created {} permissions{}",
                summary.permissions_created,
                if summary.admin_created { ", created administrator" } else { "" }
            );
            Ok(())
        }
        Commands::Permissions => {
            for permission in Permission::catalog() {
                println!("{}", permission);
            }
            Ok(())
        }
    }
}
