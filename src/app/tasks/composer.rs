use crate::core::{BuildContext, Task, TaskOutput};
use crate::utils::error::Result;
use crate::utils::process::run_tool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerCommand {
    Install,
    Update,
    CreateProject,
}

impl ComposerCommand {
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            ComposerCommand::Install => &["install"],
            ComposerCommand::Update => &["update"],
            ComposerCommand::CreateProject => &["create-project"],
        }
    }
}

/// 在專案根目錄執行 composer
pub struct ComposerTask {
    command: ComposerCommand,
}

impl ComposerTask {
    pub fn install() -> Self {
        Self {
            command: ComposerCommand::Install,
        }
    }

    pub fn update() -> Self {
        Self {
            command: ComposerCommand::Update,
        }
    }

    pub fn create_project() -> Self {
        Self {
            command: ComposerCommand::CreateProject,
        }
    }
}

#[async_trait::async_trait]
impl Task for ComposerTask {
    fn name(&self) -> &str {
        match self.command {
            ComposerCommand::Install => "composerInstall",
            ComposerCommand::Update => "composerUpdate",
            ComposerCommand::CreateProject => "init",
        }
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        let config = ctx.config();
        let output = run_tool(&config.tools.composer, self.command.args().iter().copied(), &config.root(), None)
            .await?;
        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            tracing::info!("composer: {}", line);
        }
        Ok(TaskOutput::none())
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        ctx.config().tools.composer.command_line(self.command.args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::BuildConfig;
    use crate::utils::reporter::ErrorReporter;

    #[test]
    fn test_task_names_and_commands() {
        let ctx = BuildContext::new(BuildConfig::default(), ErrorReporter::log_only());

        assert_eq!(ComposerTask::install().name(), "composerInstall");
        assert_eq!(ComposerTask::update().name(), "composerUpdate");
        assert_eq!(ComposerTask::create_project().name(), "init");
        assert_eq!(ComposerTask::update().describe(&ctx), "composer update");
        assert_eq!(ComposerTask::create_project().describe(&ctx), "composer create-project");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_composer_failure_is_tool_failed() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = BuildConfig::default();
        config.project.root = dir.path().to_string_lossy().into_owned();
        config.tools.composer =
            crate::utils::process::ToolConfig::new("sh", &["-c", "echo 'lock file out of date' >&2; exit 2", "composer"]);
        let ctx = BuildContext::new(config, ErrorReporter::log_only());

        let err = ComposerTask::install().run(&ctx).await.unwrap_err();
        assert!(matches!(err, crate::utils::error::BuildError::ToolFailed { .. }));
        assert!(err.user_friendly_message().contains("lock file out of date"));
    }
}
