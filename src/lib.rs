pub mod app;
pub mod config;
pub mod core;
pub mod css;
pub mod domain;
pub mod utils;

pub use app::{graph_for, Packager, PhpRenderer};
pub use config::toml_config::BuildConfig;
pub use config::LocalStorage;
pub use core::{BuildContext, TaskNode, TaskRunner};
pub use utils::error::{BuildError, Result};
