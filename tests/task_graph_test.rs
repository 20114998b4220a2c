use anyhow::Result;
use async_trait::async_trait;
use resume_assets::core::{Task, TaskOutput};
use resume_assets::utils::error::{BuildError, ErrorSeverity};
use resume_assets::utils::reporter::{ErrorReporter, RecordingNotifier};
use resume_assets::{BuildConfig, BuildContext, TaskNode, TaskRunner};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 睡一下再成功或失敗，並記錄完成順序
struct StepTask {
    name: &'static str,
    delay_ms: u64,
    fail_with: Option<&'static str>,
    finished: Arc<AtomicUsize>,
}

impl StepTask {
    fn ok(name: &'static str, delay_ms: u64, finished: &Arc<AtomicUsize>) -> TaskNode {
        TaskNode::task(Self {
            name,
            delay_ms,
            fail_with: None,
            finished: finished.clone(),
        })
    }

    fn failing(name: &'static str, delay_ms: u64, stderr: &'static str, finished: &Arc<AtomicUsize>) -> TaskNode {
        TaskNode::task(Self {
            name,
            delay_ms,
            fail_with: Some(stderr),
            finished: finished.clone(),
        })
    }
}

#[async_trait]
impl Task for StepTask {
    fn name(&self) -> &str {
        self.name
    }

    async fn run(&self, _ctx: &BuildContext) -> resume_assets::Result<TaskOutput> {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(stderr) => Err(BuildError::ToolFailed {
                tool: self.name.to_string(),
                status: "exit status: 1".to_string(),
                stderr: stderr.to_string(),
            }),
            None => Ok(TaskOutput::single(PathBuf::from(format!("{}.out", self.name)))),
        }
    }
}

fn context() -> (BuildContext, RecordingNotifier) {
    let notifier = RecordingNotifier::new();
    let reporter = ErrorReporter::new(Arc::new(notifier.clone()), true);
    (BuildContext::new(BuildConfig::default(), reporter), notifier)
}

#[tokio::test]
async fn test_series_of_parallel_groups_succeeds() -> Result<()> {
    let (ctx, notifier) = context();
    let finished = Arc::new(AtomicUsize::new(0));

    let graph = TaskNode::series(
        "minify",
        vec![
            TaskNode::parallel(
                "prepare",
                vec![StepTask::ok("clean", 20, &finished), StepTask::ok("compile", 5, &finished)],
            ),
            TaskNode::parallel(
                "compress",
                vec![StepTask::ok("js", 1, &finished), StepTask::ok("css", 1, &finished)],
            ),
        ],
    );

    let reports = TaskRunner::new().execute(&graph, &ctx).await?;

    assert_eq!(finished.load(Ordering::SeqCst), 4);
    let names: Vec<&str> = reports.iter().map(|r| r.task_name.as_str()).collect();
    // 第二組只在第一組全部完成後才開始
    assert_eq!(&names[2..], &["js", "css"]);
    assert!(names[..2].contains(&"clean") && names[..2].contains(&"compile"));

    let summary = TaskRunner::summary(&reports);
    assert_eq!(summary["total_tasks"], serde_json::json!(4));
    assert_eq!(summary["total_outputs"], serde_json::json!(4));
    assert!(notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_parallel_failure_lets_siblings_finish() -> Result<()> {
    let (ctx, notifier) = context();
    let finished = Arc::new(AtomicUsize::new(0));

    let graph = TaskNode::parallel(
        "front-compile",
        vec![
            StepTask::failing("sass", 1, "Error: expected \";\"", &finished),
            StepTask::ok("typescript", 30, &finished),
            StepTask::failing("serviceWorker", 10, "sw.ts(1,1): error TS1005", &finished),
        ],
    );

    let err = TaskRunner::new().execute(&graph, &ctx).await.unwrap_err();

    assert_eq!(finished.load(Ordering::SeqCst), 3);
    match err {
        BuildError::TaskFailed { task, .. } => assert_eq!(task, "sass"),
        other => panic!("unexpected error: {:?}", other),
    }

    let sent = notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|n| n.title == "Build" && n.subtitle == "Failure!"));
    assert!(sent
        .iter()
        .any(|n| n.message == "Error: sass failed: Error: expected \";\""));
    Ok(())
}

#[tokio::test]
async fn test_series_stops_after_failure() -> Result<()> {
    let (ctx, notifier) = context();
    let finished = Arc::new(AtomicUsize::new(0));

    let graph = TaskNode::series(
        "one-file",
        vec![
            StepTask::failing("minify", 1, "boom", &finished),
            StepTask::ok("packing", 1, &finished),
        ],
    );

    assert!(TaskRunner::new().execute(&graph, &ctx).await.is_err());
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert_eq!(notifier.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_disabled_notifications_only_log() -> Result<()> {
    let notifier = RecordingNotifier::new();
    let reporter = ErrorReporter::new(Arc::new(notifier.clone()), false);
    let ctx = BuildContext::new(BuildConfig::default(), reporter);
    let finished = Arc::new(AtomicUsize::new(0));

    let graph = StepTask::failing("sass", 1, "broken", &finished);
    assert!(TaskRunner::new().execute(&graph, &ctx).await.is_err());
    assert!(notifier.sent().is_empty());
    Ok(())
}

/// 找不到編譯器的任務
struct MissingToolTask;

#[async_trait]
impl Task for MissingToolTask {
    fn name(&self) -> &str {
        "typescript"
    }

    async fn run(&self, _ctx: &BuildContext) -> resume_assets::Result<TaskOutput> {
        Err(BuildError::ToolNotFound {
            tool: "tsc".to_string(),
        })
    }
}

#[tokio::test]
async fn test_missing_tool_exits_with_retry_code() -> Result<()> {
    let (ctx, _notifier) = context();
    let finished = Arc::new(AtomicUsize::new(0));

    let graph = TaskNode::series(
        "minify",
        vec![TaskNode::parallel(
            "front-compile",
            vec![StepTask::ok("sass", 1, &finished), TaskNode::task(MissingToolTask)],
        )],
    );

    let err = TaskRunner::new().execute(&graph, &ctx).await.unwrap_err();

    assert!(matches!(err, BuildError::TaskFailed { ref task, .. } if task == "typescript"));
    assert_eq!(err.severity(), ErrorSeverity::Medium);
    assert_eq!(err.exit_code(), 2);
    Ok(())
}

#[test]
fn test_named_graph_plans() {
    let ctx = BuildContext::new(BuildConfig::default(), ErrorReporter::log_only());

    let plan = resume_assets::graph_for("build").map(|g| g.plan(&ctx));
    let plan = plan.unwrap_or_default();
    assert!(plan.starts_with("build (parallel)"));
    assert!(plan.contains("- connect: php -S 0.0.0.0:8080 -t public"));
    assert!(plan.contains("- watch: watch [sass, typescript, serviceWorker, json, php, composerInstall, composerUpdate]"));

    assert!(resume_assets::graph_for("deploy").is_err());
}
