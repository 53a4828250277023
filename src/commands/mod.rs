//! One module per `payroll-api` subcommand.

pub mod jobs;
pub mod migrate;
pub mod seed;
pub mod serve;
