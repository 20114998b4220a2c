use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "resume-assets")]
#[command(about = "Builds, watches and packages the résumé site's front-end assets")]
pub struct Cli {
    /// Path to the TOML configuration (defaults to ./assets.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override project.root from the configuration
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Log CPU and memory usage around the task graph
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Disable desktop notifications on failure
    #[arg(long, global = true)]
    pub no_notify: bool,

    /// Print the task plan without running anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub task: Option<TaskCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum TaskCommand {
    /// Start the PHP development server
    Connect,
    /// Compile Sass sources into the dist directory
    Sass,
    /// Compile the TypeScript application bundle
    Typescript,
    /// Compile and minify the service worker
    #[command(alias = "serviceWorker")]
    ServiceWorker,
    /// Copy vendor font files into the public directory
    #[command(alias = "vendor_dependencies")]
    VendorDependencies,
    /// Remove previously minified artifacts
    #[command(alias = "cleanMinify")]
    CleanMinify,
    /// Compile everything, then minify CSS and JS
    Minify,
    /// Run `composer install`
    #[command(alias = "composerInstall")]
    ComposerInstall,
    /// Run `composer update`
    #[command(alias = "composerUpdate")]
    ComposerUpdate,
    /// Watch sources and re-run the owning task on change
    Watch,
    /// Minify, then package the rendered page into a standalone index.html
    #[command(name = "one-file", alias = "oneFile")]
    OneFile,
    /// Run `composer create-project`
    Init,
    /// Start the server, compile and watch (default)
    Build,
}

impl Cli {
    pub fn task(&self) -> TaskCommand {
        self.task.unwrap_or(TaskCommand::Build)
    }
}

impl TaskCommand {
    /// 任務圖中的名稱
    pub fn task_name(&self) -> &'static str {
        match self {
            TaskCommand::Connect => "connect",
            TaskCommand::Sass => "sass",
            TaskCommand::Typescript => "typescript",
            TaskCommand::ServiceWorker => "serviceWorker",
            TaskCommand::VendorDependencies => "vendor_dependencies",
            TaskCommand::CleanMinify => "cleanMinify",
            TaskCommand::Minify => "minify",
            TaskCommand::ComposerInstall => "composerInstall",
            TaskCommand::ComposerUpdate => "composerUpdate",
            TaskCommand::Watch => "watch",
            TaskCommand::OneFile => "one-file",
            TaskCommand::Init => "init",
            TaskCommand::Build => "build",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_task_is_build() {
        let cli = Cli::parse_from(["resume-assets"]);
        assert_eq!(cli.task(), TaskCommand::Build);
    }

    #[test]
    fn test_task_runner_style_aliases() {
        let cli = Cli::parse_from(["resume-assets", "serviceWorker"]);
        assert_eq!(cli.task(), TaskCommand::ServiceWorker);

        let cli = Cli::parse_from(["resume-assets", "one-file", "--no-notify"]);
        assert_eq!(cli.task(), TaskCommand::OneFile);
        assert!(cli.no_notify);

        let cli = Cli::parse_from(["resume-assets", "--dry-run", "composerUpdate"]);
        assert_eq!(cli.task(), TaskCommand::ComposerUpdate);
        assert!(cli.dry_run);
    }

    #[test]
    fn test_every_command_maps_to_a_graph() {
        let commands = [
            TaskCommand::Connect,
            TaskCommand::Sass,
            TaskCommand::Typescript,
            TaskCommand::ServiceWorker,
            TaskCommand::VendorDependencies,
            TaskCommand::CleanMinify,
            TaskCommand::Minify,
            TaskCommand::ComposerInstall,
            TaskCommand::ComposerUpdate,
            TaskCommand::Watch,
            TaskCommand::OneFile,
            TaskCommand::Init,
            TaskCommand::Build,
        ];
        for command in commands {
            assert!(crate::app::graph_for(command.task_name()).is_ok());
        }
    }
}
