use crate::core::{BuildContext, Task, TaskOutput};
use crate::utils::error::Result;
use crate::utils::process::spawn_service;

/// `php -S host:port -t public`，啟動後交給 context 管理
pub struct ConnectTask;

impl ConnectTask {
    fn server_args(ctx: &BuildContext) -> Vec<String> {
        let config = ctx.config();
        vec![
            "-S".to_string(),
            format!("{}:{}", config.server.host, config.server.port),
            "-t".to_string(),
            config.project.public_dir.clone(),
        ]
    }
}

#[async_trait::async_trait]
impl Task for ConnectTask {
    fn name(&self) -> &str {
        "connect"
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        let config = ctx.config();
        let child = spawn_service(&config.tools.php, Self::server_args(ctx), &config.root())?;
        ctx.register_service(self.name(), child);

        tracing::info!("🌐 Serving {} at {}", config.project.public_dir, config.server_url());
        Ok(TaskOutput::none())
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        ctx.config().tools.php.command_line(Self::server_args(ctx))
    }
}
