//! 建置流程中的單一任務
pub mod compile;
pub mod composer;
pub mod minify;
pub mod server;
pub mod vendor;

pub use compile::{SassTask, ServiceWorkerTask, TypeScriptTask};
pub use composer::{ComposerCommand, ComposerTask};
pub use minify::{CleanMinifyTask, MinifyCssTask, MinifyJsTask};
pub use server::ConnectTask;
pub use vendor::VendorFontsTask;
