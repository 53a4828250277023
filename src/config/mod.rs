//! Runtime settings read from the environment, plus fixed payroll limits
//! (upload size, pagination caps, password policy, rate-limit windows).

mod constants;
mod settings;

pub use constants::*;
pub use settings::Config;
