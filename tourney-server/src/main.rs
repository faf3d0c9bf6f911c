mod auth;
mod config;
mod http;
mod identity;
mod logger;
mod signal;
mod state;
mod store;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use hyper::StatusCode;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tourney_api::Event;

pub use config::Config;
pub use state::State;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML config file. Environment variables override its values.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve both handlers over HTTP (default).
    Serve,
    /// Run a single event through a handler and print the response.
    Invoke {
        handler: Handler,
        /// Read the event from this file instead of stdin.
        #[arg(long)]
        event: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Handler {
    Auth,
    Tournaments,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match Config::load(&args.config).await {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = logger::init(config.loglevel) {
        eprintln!("Failed to install logger: {}", err);
    }

    log::info!("Using config: {:?}", config);

    if let Err(err) = run(args.command.unwrap_or(Command::Serve), config).await {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(command: Command, config: Config) -> Result<(), Error> {
    let state = State::new(&config).await?;

    match command {
        Command::Serve => {
            let shutdown = signal::listen();
            http::bind(config.bind, state, shutdown).await
        }
        Command::Invoke { handler, event } => {
            let buf = match event {
                Some(path) => tokio::fs::read(path).await?,
                None => {
                    let mut buf = Vec::new();
                    tokio::io::stdin().read_to_end(&mut buf).await?;
                    buf
                }
            };

            let event: Event = serde_json::from_slice(&buf)?;

            let resp = match handler {
                Handler::Auth => http::auth::handle(&state, event).await,
                Handler::Tournaments => http::tournaments::handle(&state, event).await,
            };

            println!("{}", serde_json::to_string_pretty(&resp)?);
            Ok(())
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Store(#[from] sqlx::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Hyper(#[from] hyper::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Config(#[from] config::ConfigError),
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("{0}")]
    StatusCodeError(#[from] StatusCodeError),
}

impl Error {
    /// Turns a [`Error::UniqueViolation`] into a 409 with the given `message`. All other errors
    /// are returned unchanged.
    pub fn on_conflict(self, message: &str) -> Self {
        match self {
            Self::UniqueViolation(detail) => {
                log::warn!("Rejecting duplicate: {}", detail);

                StatusCodeError::conflict().message(message).into()
            }
            err => err,
        }
    }
}

/// An error that is returned to the caller as-is, with the given status code and message.
#[derive(Clone, Debug, Error)]
#[error("{code}: {message}")]
pub struct StatusCodeError {
    pub code: StatusCode,
    pub message: String,
}

impl StatusCodeError {
    pub fn new<T>(code: StatusCode, message: T) -> Self
    where
        T: ToString,
    {
        Self {
            code,
            message: message.to_string(),
        }
    }

    /// Replaces the message.
    pub fn message<T>(mut self, message: T) -> Self
    where
        T: ToString,
    {
        self.message = message.to_string();
        self
    }

    /// 400 Bad Request
    #[inline]
    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request")
    }

    /// 401 Unauthorized
    #[inline]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    /// 404 Not Found
    #[inline]
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found")
    }

    /// 405 Method Not Allowed
    #[inline]
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    /// 408 Request Timeout
    #[inline]
    pub fn request_timeout() -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, "Request Timeout")
    }

    /// 409 Conflict
    #[inline]
    pub fn conflict() -> Self {
        Self::new(StatusCode::CONFLICT, "Conflict")
    }

    /// 413 Payload Too Large
    #[inline]
    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large")
    }
}
