use crate::utils::error::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// 外部工具設定：執行檔與固定參數
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolConfig {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// 組出完整命令列（供 dry-run 與日誌使用）
    pub fn command_line<I, S>(&self, extra: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.extend(extra.into_iter().map(|s| s.as_ref().to_string_lossy().into_owned()));
        parts.join(" ")
    }

    fn command<I, S>(&self, extra: I, cwd: &Path) -> Command
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(extra.into_iter().map(Into::into))
            .current_dir(cwd)
            .stdin(Stdio::null());
        cmd
    }
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

fn spawn_error(tool: &str, err: std::io::Error) -> BuildError {
    if err.kind() == std::io::ErrorKind::NotFound {
        BuildError::ToolNotFound {
            tool: tool.to_string(),
        }
    } else {
        BuildError::IoError(err)
    }
}

/// 執行工具直到結束，擷取 stdout / stderr；stdout 超過 `max_stdout` 位元組即視為失敗
pub async fn run_tool<I, S>(
    tool: &ToolConfig,
    extra: I,
    cwd: &Path,
    max_stdout: Option<usize>,
) -> Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut child = tool
        .command(extra, cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(&tool.program, e))?;

    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();

    let read_stdout = async {
        let mut buf = Vec::new();
        let mut total = 0usize;
        if let Some(pipe) = stdout_pipe.as_mut() {
            let mut chunk = [0u8; 8192];
            loop {
                let n = pipe.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                total += n;
                // 超過上限後繼續讀取但丟棄，避免子程序卡在寫入
                if max_stdout.map_or(true, |limit| buf.len() <= limit) {
                    buf.extend_from_slice(&chunk[..n]);
                }
            }
        }
        Ok::<_, std::io::Error>((buf, total))
    };
    let read_stderr = async {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            pipe.read_to_end(&mut buf).await?;
        }
        Ok::<_, std::io::Error>(buf)
    };

    let ((stdout, total), stderr) = tokio::try_join!(read_stdout, read_stderr)?;

    if let Some(limit) = max_stdout {
        if total > limit {
            return Err(BuildError::OutputTooLarge {
                tool: tool.program.clone(),
                limit,
            });
        }
    }

    let status = child.wait().await?;
    let stdout = String::from_utf8_lossy(&stdout).into_owned();
    let stderr = String::from_utf8_lossy(&stderr).into_owned();

    if !status.success() {
        return Err(BuildError::ToolFailed {
            tool: tool.program.clone(),
            status: status.to_string(),
            stderr,
        });
    }

    if !stderr.trim().is_empty() {
        tracing::debug!("{} stderr: {}", tool.program, stderr.trim());
    }

    Ok(ToolOutput { stdout, stderr })
}

/// 啟動長駐程序（例如開發伺服器），輸出直接繼承終端機
pub fn spawn_service<I, S>(tool: &ToolConfig, extra: I, cwd: &Path) -> Result<Child>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    tool.command(extra, cwd)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(&tool.program, e))
}

/// 啟動後不等待結果（桌面通知等）
pub fn spawn_detached<I, S>(tool: &ToolConfig, extra: I, cwd: &Path) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut child = tool
        .command(extra, cwd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| spawn_error(&tool.program, e))?;

    let program = tool.program.clone();
    tokio::spawn(async move {
        if let Err(e) = child.wait().await {
            tracing::debug!("{} did not finish cleanly: {}", program, e);
        }
    });
    Ok(())
}
