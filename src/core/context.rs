use crate::config::toml_config::BuildConfig;
use crate::utils::reporter::ErrorReporter;
use std::sync::{Arc, Mutex};
use tokio::process::Child;

/// 每個任務都會拿到的執行上下文：設定、錯誤出口與長駐服務
#[derive(Debug)]
pub struct BuildContext {
    pub config: Arc<BuildConfig>,
    pub reporter: ErrorReporter,
    pub run_id: String,
    services: Mutex<Vec<(String, Child)>>,
}

impl BuildContext {
    pub fn new(config: BuildConfig, reporter: ErrorReporter) -> Self {
        let run_id = format!("build-{}", chrono::Local::now().format("%Y%m%dT%H%M%S"));
        Self {
            config: Arc::new(config),
            reporter,
            run_id,
            services: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// 登記長駐子程序；context 被丟棄時子程序一併結束
    pub fn register_service(&self, name: &str, child: Child) {
        if let Ok(mut services) = self.services.lock() {
            services.push((name.to_string(), child));
        }
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services
            .lock()
            .map(|s| s.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn has_services(&self) -> bool {
        !self.service_names().is_empty()
    }

    pub async fn shutdown_services(&self) {
        let services: Vec<(String, Child)> = match self.services.lock() {
            Ok(mut s) => s.drain(..).collect(),
            Err(_) => return,
        };
        for (name, mut child) in services {
            tracing::info!("Stopping {}", name);
            if let Err(e) = child.kill().await {
                tracing::warn!("Failed to stop {}: {}", name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_prefix() {
        let ctx = BuildContext::new(BuildConfig::default(), ErrorReporter::log_only());
        assert!(ctx.run_id.starts_with("build-"));
        assert!(!ctx.has_services());
    }
}
