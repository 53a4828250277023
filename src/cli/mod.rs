//! `payroll-api` command line: `serve`, `migrate`, `jobs` (salary slip mail
//! worker) and `seed` (default admin).

pub mod args;

pub use args::{Cli, Commands};
