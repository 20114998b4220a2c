use crate::core::context::BuildContext;
use crate::domain::model::TaskReport;
use crate::domain::ports::Task;
use crate::utils::error::{BuildError, Result};
use crate::utils::monitor::SystemMonitor;
use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// 任務圖節點：單一任務、依序執行或並行執行
#[derive(Clone)]
pub enum TaskNode {
    Task(Arc<dyn Task>),
    Series(String, Vec<TaskNode>),
    Parallel(String, Vec<TaskNode>),
}

impl TaskNode {
    pub fn task<T: Task + 'static>(task: T) -> Self {
        TaskNode::Task(Arc::new(task))
    }

    pub fn series(name: &str, children: Vec<TaskNode>) -> Self {
        TaskNode::Series(name.to_string(), children)
    }

    pub fn parallel(name: &str, children: Vec<TaskNode>) -> Self {
        TaskNode::Parallel(name.to_string(), children)
    }

    pub fn name(&self) -> &str {
        match self {
            TaskNode::Task(task) => task.name(),
            TaskNode::Series(name, _) | TaskNode::Parallel(name, _) => name,
        }
    }

    /// 縮排文字形式的執行計畫（--dry-run）
    pub fn plan(&self, ctx: &BuildContext) -> String {
        let mut lines = Vec::new();
        self.plan_into(ctx, 0, &mut lines);
        lines.join("\n")
    }

    fn plan_into(&self, ctx: &BuildContext, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        match self {
            TaskNode::Task(task) => {
                lines.push(format!("{}- {}: {}", indent, task.name(), task.describe(ctx)))
            }
            TaskNode::Series(name, children) | TaskNode::Parallel(name, children) => {
                let kind = if matches!(self, TaskNode::Series(..)) {
                    "series"
                } else {
                    "parallel"
                };
                lines.push(format!("{}{} ({})", indent, name, kind));
                for child in children {
                    child.plan_into(ctx, depth + 1, lines);
                }
            }
        }
    }
}

impl std::fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskNode::Task(task) => write!(f, "Task({})", task.name()),
            TaskNode::Series(name, children) => f.debug_tuple("Series").field(name).field(children).finish(),
            TaskNode::Parallel(name, children) => {
                f.debug_tuple("Parallel").field(name).field(children).finish()
            }
        }
    }
}

/// 執行任務圖並收集每個任務的結果
pub struct TaskRunner {
    monitor: Option<SystemMonitor>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self { monitor: None }
    }

    /// 啟用或禁用系統監控
    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled.then(|| SystemMonitor::new(true));
        self
    }

    pub async fn execute(&self, node: &TaskNode, ctx: &BuildContext) -> Result<Vec<TaskReport>> {
        if let Some(monitor) = &self.monitor {
            monitor.log_snapshot(&format!("{} started", node.name()));
        }

        let reports = Mutex::new(Vec::new());
        let outcome = Self::run_node(node, ctx, &reports).await;

        if let Some(monitor) = &self.monitor {
            monitor.log_snapshot(&format!("{} finished", node.name()));
        }

        outcome?;
        Ok(reports.into_inner().unwrap_or_default())
    }

    fn run_node<'a>(
        node: &'a TaskNode,
        ctx: &'a BuildContext,
        reports: &'a Mutex<Vec<TaskReport>>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            match node {
                TaskNode::Task(task) => {
                    let start_time = Instant::now();
                    tracing::info!("▶️ Starting '{}'", task.name());

                    match task.run(ctx).await {
                        Ok(output) => {
                            let report = TaskReport {
                                task_name: task.name().to_string(),
                                outputs: output.outputs,
                                duration: start_time.elapsed(),
                            };
                            tracing::info!(
                                "✅ Finished '{}' (outputs: {}, duration: {:?})",
                                report.task_name,
                                report.outputs.len(),
                                report.duration
                            );
                            if let Ok(mut r) = reports.lock() {
                                r.push(report);
                            }
                            Ok(())
                        }
                        Err(e) => {
                            // 錯誤只在發生的葉節點回報一次
                            ctx.reporter.report(task.name(), &e);
                            Err(BuildError::task_failed(task.name(), &e))
                        }
                    }
                }
                TaskNode::Series(_, children) => {
                    for child in children {
                        Self::run_node(child, ctx, reports).await?;
                    }
                    Ok(())
                }
                TaskNode::Parallel(name, children) => {
                    let results =
                        join_all(children.iter().map(|c| Self::run_node(c, ctx, reports))).await;
                    let failures = results.iter().filter(|r| r.is_err()).count();
                    if failures > 0 {
                        tracing::debug!("{} of {} branches in '{}' failed", failures, results.len(), name);
                    }
                    results.into_iter().collect::<Result<Vec<()>>>().map(|_| ())
                }
            }
        }
        .boxed()
    }

    /// 獲取執行摘要
    pub fn summary(reports: &[TaskReport]) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let total_outputs: usize = reports.iter().map(|r| r.outputs.len()).sum();
        let total_duration: std::time::Duration = reports.iter().map(|r| r.duration).sum();

        summary.insert("total_tasks".to_string(), serde_json::Value::Number(reports.len().into()));
        summary.insert("total_outputs".to_string(), serde_json::Value::Number(total_outputs.into()));
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((total_duration.as_millis() as u64).into()),
        );

        let task_names: Vec<serde_json::Value> = reports
            .iter()
            .map(|r| serde_json::Value::String(r.task_name.clone()))
            .collect();
        summary.insert("executed_tasks".to_string(), serde_json::Value::Array(task_names));

        summary
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}
