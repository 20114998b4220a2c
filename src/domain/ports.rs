use crate::core::context::BuildContext;
use crate::domain::model::{Notification, TaskOutput};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 產生完整 HTML 的外部渲染器
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self) -> Result<String>;
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// 任務圖中的葉節點
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput>;

    /// dry-run 時顯示的說明
    fn describe(&self, _ctx: &BuildContext) -> String {
        self.name().to_string()
    }
}
