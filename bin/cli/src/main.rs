//! `coursehall` command-line login client.
//!
//! # Usage
//!
//! ```text
//! coursehall login --email alice@example.com --password secret
//! coursehall whoami
//! coursehall logout
//! ```

mod config;

use clap::{Parser, Subcommand};
use config::AppConfig;
use coursehall_firebase::FirebaseBackend;
use coursehall_platform_access::{AdmissionGate, FileSessionStore, Session};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "coursehall", about = "Log in to the course platform")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in with email and password and persist the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// End the current session.
    Logout,
    /// Show the current session.
    Whoami,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let backend = match FirebaseBackend::new(config.firebase) {
        Ok(backend) => Arc::new(backend),
        Err(report) => {
            tracing::error!(error = %report, "Failed to initialize Firebase backend");
            return ExitCode::FAILURE;
        }
    };
    let sessions = Arc::new(FileSessionStore::new(config.session.dir, config.session.key));
    let gate = AdmissionGate::new(backend.clone(), backend, sessions, config.admission);

    match args.command {
        Command::Login { email, password } => match gate.login(&email, &password).await {
            Ok(session) => {
                println!("{}", describe(&session));
                ExitCode::SUCCESS
            }
            Err(reason) => {
                eprintln!("Login denied: {reason} ({})", reason.code());
                ExitCode::FAILURE
            }
        },
        Command::Logout => {
            match gate.restore().await {
                Some(session) => {
                    gate.logout(&session).await;
                    println!("Logged out {}", session.email());
                }
                None => println!("Not logged in"),
            }
            ExitCode::SUCCESS
        }
        Command::Whoami => match gate.restore().await {
            Some(session) => {
                println!("{}", describe(&session));
                ExitCode::SUCCESS
            }
            None => {
                println!("Not logged in");
                ExitCode::FAILURE
            }
        },
    }
}

fn describe(session: &Session) -> String {
    let mut out = format!(
        "{} ({}, {}, id {})",
        session.email(),
        session.role(),
        session.status(),
        session.identity_id()
    );
    if let Some(window) = session.membership_window() {
        out.push_str(&format!(
            "\nmembership: {} to {}",
            window.start().format("%Y-%m-%d"),
            window.end().format("%Y-%m-%d")
        ));
    }
    out
}
