pub mod error;
pub mod logger;
pub mod monitor;
pub mod process;
pub mod reporter;
pub mod validation;
