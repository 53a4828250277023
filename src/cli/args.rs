//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// Payroll API - employees, expense claims, salary slips and notifications
#[derive(Parser, Debug)]
#[command(name = "payroll-api")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (applies pending migrations first)
    Serve(ServeArgs),

    /// Run database migrations
    Migrate(MigrateArgs),

    /// Manage the email job queue
    Jobs(JobsArgs),

    /// Create the default admin account if it does not exist
    Seed,
}

/// Overrides for the configured bind address
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Host to bind to [default: SERVER_HOST or 0.0.0.0]
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on [default: SERVER_PORT or 5000]
    #[arg(short, long)]
    pub port: Option<u16>,
}

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Drop everything and re-run all migrations
    Fresh,
}

#[derive(Parser, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub action: JobsAction,
}

#[derive(Subcommand, Debug)]
pub enum JobsAction {
    /// Start the email worker
    Work,
    /// Show queue counts by status
    List,
    /// Delete failed jobs
    Clear,
}
