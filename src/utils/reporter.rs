use crate::domain::model::Notification;
use crate::domain::ports::Notifier;
use crate::utils::error::{BuildError, Result};
use crate::utils::process::{spawn_detached, ToolConfig};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 透過外部指令（預設 notify-send）送出桌面通知
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    tool: ToolConfig,
    cwd: PathBuf,
}

impl DesktopNotifier {
    pub fn new(tool: ToolConfig, cwd: PathBuf) -> Self {
        Self { tool, cwd }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let body = format!("{}\n{}", notification.subtitle, notification.message);
        spawn_detached(&self.tool, [notification.title.clone(), body], &self.cwd)
    }
}

/// 只記錄收到的通知，供測試使用
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
        Ok(())
    }
}

/// 所有任務共用的錯誤出口：寫日誌並（視設定）發出桌面通知
#[derive(Clone)]
pub struct ErrorReporter {
    notifier: Arc<dyn Notifier>,
    notifications_enabled: bool,
}

impl ErrorReporter {
    pub fn new(notifier: Arc<dyn Notifier>, notifications_enabled: bool) -> Self {
        Self {
            notifier,
            notifications_enabled,
        }
    }

    /// 不發通知、只寫日誌
    pub fn log_only() -> Self {
        Self::new(Arc::new(RecordingNotifier::new()), false)
    }

    pub fn report(&self, task: &str, error: &BuildError) {
        tracing::error!(
            "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
            task,
            error,
            error.category(),
            error.severity()
        );
        if let BuildError::ToolFailed { stderr, .. } = error {
            if !stderr.trim().is_empty() {
                tracing::error!("{}", stderr.trim_end());
            }
        }
        tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());

        if !self.notifications_enabled {
            return;
        }

        let notification = Notification::failure(error.user_friendly_message());
        match self.notifier.notify(&notification) {
            Ok(()) => tracing::debug!("Notify {}", task),
            Err(e) => tracing::warn!("Desktop notification failed: {}", e),
        }
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("notifications_enabled", &self.notifications_enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_sends_failure_notification() {
        let notifier = RecordingNotifier::new();
        let reporter = ErrorReporter::new(Arc::new(notifier.clone()), true);

        reporter.report(
            "sass",
            &BuildError::ToolNotFound {
                tool: "sass".to_string(),
            },
        );

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Build");
        assert_eq!(sent[0].subtitle, "Failure!");
        assert_eq!(sent[0].message, "Error: Tool 'sass' was not found on PATH");
    }

    #[test]
    fn test_disabled_notifications_only_log() {
        let notifier = RecordingNotifier::new();
        let reporter = ErrorReporter::new(Arc::new(notifier.clone()), false);
        reporter.report(
            "minify",
            &BuildError::ConfigError {
                message: "bad".to_string(),
            },
        );
        assert!(notifier.sent().is_empty());
    }
}
