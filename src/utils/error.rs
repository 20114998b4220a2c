use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("File watcher error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Background task panicked or was cancelled: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Tool '{tool}' was not found on PATH")]
    ToolNotFound { tool: String },

    #[error("Tool '{tool}' exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Output of '{tool}' exceeded {limit} bytes")]
    OutputTooLarge { tool: String, limit: usize },

    #[error("Rendered HTML does not contain {marker}")]
    MarkerMissing { marker: String },

    #[error("CSS parse error at byte {offset}: {message}")]
    CssParseError { offset: usize, message: String },

    #[error("Task '{task}' failed: {details}")]
    TaskFailed {
        task: String,
        details: String,
        /// 葉節點錯誤的嚴重程度，決定最終退出碼
        severity: ErrorSeverity,
    },

    #[error("Unknown task: {name}")]
    UnknownTask { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Tooling,
    Packaging,
    FileSystem,
    Execution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BuildError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BuildError::ConfigError { .. }
            | BuildError::InvalidConfigValueError { .. }
            | BuildError::MissingConfigError { .. }
            | BuildError::ConfigValidationError { .. }
            | BuildError::UnknownTask { .. } => ErrorCategory::Configuration,
            BuildError::ToolNotFound { .. }
            | BuildError::ToolFailed { .. }
            | BuildError::OutputTooLarge { .. } => ErrorCategory::Tooling,
            BuildError::MarkerMissing { .. }
            | BuildError::CssParseError { .. }
            | BuildError::SerializationError(_) => ErrorCategory::Packaging,
            BuildError::IoError(_) | BuildError::WalkError(_) | BuildError::WatchError(_) => {
                ErrorCategory::FileSystem
            }
            BuildError::JoinError(_) | BuildError::TaskFailed { .. } => ErrorCategory::Execution,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        if let BuildError::TaskFailed { severity, .. } = self {
            return *severity;
        }
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            // 編譯器錯誤通常修正原始碼後重跑即可
            ErrorCategory::Tooling => ErrorSeverity::Medium,
            ErrorCategory::Packaging => ErrorSeverity::High,
            ErrorCategory::FileSystem => ErrorSeverity::Critical,
            ErrorCategory::Execution => match self {
                BuildError::JoinError(_) => ErrorSeverity::Critical,
                _ => ErrorSeverity::High,
            },
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BuildError::ToolNotFound { tool } => {
                format!("Install '{}' or point the [tools] section of assets.toml at it", tool)
            }
            BuildError::ToolFailed { tool, .. } => {
                format!("Fix the reported problem and re-run; the output above comes from '{}'", tool)
            }
            BuildError::OutputTooLarge { .. } => {
                "Raise package.max_output_bytes in assets.toml".to_string()
            }
            BuildError::MarkerMissing { .. } => {
                "Check that the renderer is invoked with --one-file and emits the style marker and license placeholder".to_string()
            }
            BuildError::CssParseError { .. } => {
                "Inspect the minified stylesheet; it is probably truncated".to_string()
            }
            BuildError::UnknownTask { .. } => "Run with --help to list the available tasks".to_string(),
            BuildError::IoError(_) | BuildError::WalkError(_) => {
                "Check that the paths in assets.toml exist and are readable".to_string()
            }
            BuildError::WatchError(_) => {
                "Check the inotify watch limit (fs.inotify.max_user_watches)".to_string()
            }
            _ if self.category() == ErrorCategory::Configuration => {
                "Review assets.toml and the command-line flags".to_string()
            }
            _ => "Re-run with --verbose for details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BuildError::ToolFailed { tool, stderr, .. } => {
                let first_line = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
                format!("{} failed: {}", tool, first_line.trim())
            }
            BuildError::TaskFailed { task, .. } => format!("Task '{}' failed", task),
            other => other.to_string(),
        }
    }

    /// 將任意錯誤包裝成指定任務的失敗
    pub fn task_failed(task: &str, err: &BuildError) -> Self {
        BuildError::TaskFailed {
            task: task.to_string(),
            details: err.to_string(),
            severity: err.severity(),
        }
    }

    /// 依嚴重程度決定行程退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,      // 警告，但成功
            ErrorSeverity::Medium => 2,   // 可修正後重試
            ErrorSeverity::High => 1,     // 任務失敗
            ErrorSeverity::Critical => 3, // 設定或系統錯誤
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
