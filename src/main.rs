use std::env;

use colored::Colorize;
use flashmob_collab::{AuthError, Collab, DatabaseError, MemoryDatabase, PgDatabase};
use flashmob_core::{Config, ConfigError};
use log::{error, info, warn};
use thiserror::Error;
use tokio::runtime::{self, Runtime};

use crate::logging::LogColor;

mod logging;

const USAGE: &str = "flashmob [create-admin <email> <password> [name]]";

/// What the binary was asked to do
#[derive(Debug, PartialEq)]
enum Command {
    Serve,
    CreateAdmin {
        email: String,
        password: String,
        name: String,
    },
}

struct Flashmob {
    config: Config,
    collab: Collab,
    runtime: Runtime,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),

    #[error("Could not create admin: {0}")]
    Admin(#[from] AuthError),

    #[error("Unknown arguments, usage: {0}")]
    Usage(&'static str),

    #[error("Server stopped: {0}")]
    Server(std::io::Error),

    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Command {
    fn parse<I>(args: I) -> Result<Self, StartupError>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<_> = args.into_iter().collect();
        let args: Vec<_> = args.iter().map(String::as_str).collect();

        match args.as_slice() {
            [] => Ok(Self::Serve),
            ["create-admin", email, password] => Ok(Self::CreateAdmin {
                email: email.to_string(),
                password: password.to_string(),
                name: "Admin".to_string(),
            }),
            ["create-admin", email, password, name] => Ok(Self::CreateAdmin {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
            }),
            _ => Err(StartupError::Usage(USAGE)),
        }
    }
}

impl Flashmob {
    fn new(config: Config) -> Result<Self, StartupError> {
        info!("Building async runtime...");
        let runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("flashmob-async")
            .build()
            .map_err(|e| StartupError::Fatal(e.to_string()))?;

        let collab = match &config.database_url {
            Some(url) => {
                info!("Connecting to database...");

                let database = runtime.block_on(async {
                    let database = PgDatabase::new(url).await?;
                    database.migrate().await?;

                    Ok::<_, DatabaseError>(database)
                })?;

                Collab::new(config.clone(), database)
            }
            None => {
                warn!(
                    "{} is not set, data is kept in memory and lost on exit",
                    Config::DATABASE_URL_VAR
                );

                Collab::new(config.clone(), MemoryDatabase::new())
            }
        };

        Ok(Self {
            config,
            collab,
            runtime,
        })
    }

    fn run(self, command: Command) -> Result<(), StartupError> {
        match command {
            Command::Serve => {
                let port = self.config.server_port;

                self.runtime
                    .block_on(flashmob_server::run_server(self.collab, port))
                    .map_err(StartupError::Server)
            }
            Command::CreateAdmin {
                email,
                password,
                name,
            } => {
                let admin = self
                    .runtime
                    .block_on(self.collab.auth.bootstrap_admin(&email, &password, &name))?;

                info!("{} is now a platform admin (id {})", admin.email, admin.id);
                Ok(())
            }
        }
    }
}

impl StartupError {
    fn hint(&self) -> String {
        match self {
            StartupError::Config(e) => format!("Check the value of {}, or unset it to use the default.", e.key),
            StartupError::Database(_) => format!("This is a database error. Make sure Postgres is running and {} points to it, then try again.", Config::DATABASE_URL_VAR),
            StartupError::Admin(_) => "The password must be at least 6 characters.".to_string(),
            StartupError::Usage(_) => "Run without arguments to start the server.".to_string(),
            StartupError::Server(_) => format!("Make sure nothing else listens on the port, or change {}.", Config::SERVER_PORT_VAR),
            StartupError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn start() -> Result<(), StartupError> {
    let command = Command::parse(env::args().skip(1))?;
    let config = Config::from_env()?;

    Flashmob::new(config)?.run(command)
}

fn main() {
    if let Err(e) = logging::init_logger() {
        eprintln!("Could not initialize logging: {}", e);
    }

    if let Err(error) = start() {
        error!("{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.", "flashmob failed to start!".bold().color(LogColor::Red));
        error!("{}", error);
        error!(
            "{}",
            format!("Hint: {}", error.hint())
                .color(LogColor::Dimmed)
                .italic()
        );

        std::process::exit(1);
    }
}
