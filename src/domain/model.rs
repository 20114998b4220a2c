use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 單一任務執行後產生的檔案
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub outputs: Vec<PathBuf>,
}

impl TaskOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_outputs(outputs: Vec<PathBuf>) -> Self {
        Self { outputs }
    }

    pub fn single(path: PathBuf) -> Self {
        Self {
            outputs: vec![path],
        }
    }
}

/// 任務執行結果
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task_name: String,
    pub outputs: Vec<PathBuf>,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: String,
    pub message: String,
}

impl Notification {
    pub fn failure(message: impl AsRef<str>) -> Self {
        Self {
            title: "Build".to_string(),
            subtitle: "Failure!".to_string(),
            message: format!("Error: {}", message.as_ref()),
        }
    }
}

/// 單檔打包的結果摘要
#[derive(Debug, Clone, Serialize)]
pub struct PackageOutcome {
    pub output_path: PathBuf,
    pub css_bytes: usize,
    pub licenses: Vec<String>,
    pub purged_selectors: usize,
}
