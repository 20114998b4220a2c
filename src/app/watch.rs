use crate::app::tasks::{ComposerTask, SassTask, ServiceWorkerTask, TypeScriptTask};
use crate::config::toml_config::BuildConfig;
use crate::core::{BuildContext, Task, TaskNode, TaskOutput, TaskRunner};
use crate::utils::error::Result;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher as _};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// 檔案符合規則時要做的事
#[derive(Debug, Clone)]
pub enum WatchAction {
    Run(TaskNode),
    /// 只提示重新整理瀏覽器
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// `dir/**/*.ext`
    Tree { dir: PathBuf, ext: String },
    /// `dir/*.ext`（depth 1）、`dir/*/*.ext`（depth 2）
    Depth { dir: PathBuf, depth: usize, ext: String },
    File(PathBuf),
}

impl Matcher {
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Matcher::Tree { dir, ext } => path.starts_with(dir) && has_extension(path, ext),
            Matcher::Depth { dir, depth, ext } => path
                .strip_prefix(dir)
                .is_ok_and(|rel| rel.components().count() == *depth && has_extension(path, ext)),
            Matcher::File(file) => path == file.as_path(),
        }
    }

    /// 需要向 notify 註冊的目錄
    pub fn target(&self) -> (PathBuf, RecursiveMode) {
        match self {
            Matcher::Tree { dir, .. } => (dir.clone(), RecursiveMode::Recursive),
            Matcher::Depth { dir, depth: 1, .. } => (dir.clone(), RecursiveMode::NonRecursive),
            Matcher::Depth { dir, .. } => (dir.clone(), RecursiveMode::Recursive),
            Matcher::File(file) => (
                file.parent().map(Path::to_path_buf).unwrap_or_default(),
                RecursiveMode::NonRecursive,
            ),
        }
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

#[derive(Debug, Clone)]
pub struct WatchRule {
    pub name: String,
    pub matcher: Matcher,
    pub action: WatchAction,
}

impl WatchRule {
    fn run<T: Task + 'static>(matcher: Matcher, task: T) -> Self {
        Self {
            name: task.name().to_string(),
            matcher,
            action: WatchAction::Run(TaskNode::task(task)),
        }
    }

    fn reload(name: &str, matcher: Matcher) -> Self {
        Self {
            name: name.to_string(),
            matcher,
            action: WatchAction::Reload,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchPlan {
    rules: Vec<WatchRule>,
    ignore: Vec<String>,
    dist_dir: PathBuf,
}

impl WatchPlan {
    pub fn from_config(config: &BuildConfig) -> Self {
        let rules = vec![
            WatchRule::run(
                Matcher::Tree {
                    dir: config.resolve(&config.sources.sass_dir),
                    ext: "scss".to_string(),
                },
                SassTask,
            ),
            WatchRule::run(
                Matcher::Depth {
                    dir: config.resolve(&config.sources.ts_dir),
                    depth: 1,
                    ext: "ts".to_string(),
                },
                TypeScriptTask,
            ),
            WatchRule::run(
                Matcher::File(config.resolve(&config.sources.service_worker)),
                ServiceWorkerTask,
            ),
            WatchRule::reload(
                "json",
                Matcher::Depth {
                    dir: config.resolve(&config.sources.json_dir),
                    depth: 1,
                    ext: "json".to_string(),
                },
            ),
            WatchRule::reload(
                "php",
                Matcher::Depth {
                    dir: config.resolve(&config.sources.php_dir),
                    depth: 2,
                    ext: "php".to_string(),
                },
            ),
            WatchRule::run(
                Matcher::File(config.resolve("composer.lock")),
                ComposerTask::install(),
            ),
            WatchRule::run(
                Matcher::File(config.resolve("composer.json")),
                ComposerTask::update(),
            ),
        ];

        Self {
            rules,
            ignore: config.watch.ignore.clone(),
            dist_dir: config.dist_dir(),
        }
    }

    pub fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        path.starts_with(&self.dist_dir)
            || path.components().any(|c| {
                let part = c.as_os_str().to_string_lossy();
                self.ignore.iter().any(|ignored| *ignored == part)
            })
    }

    pub fn rules_for(&self, path: &Path) -> Vec<&WatchRule> {
        if self.is_ignored(path) {
            return Vec::new();
        }
        self.rules.iter().filter(|r| r.matcher.matches(path)).collect()
    }

    /// 去除重複後的監看目錄；遞迴監看優先
    pub fn watch_targets(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut targets: Vec<(PathBuf, RecursiveMode)> = Vec::new();
        for (dir, mode) in self.rules.iter().map(|r| r.matcher.target()) {
            match targets.iter_mut().find(|(existing, _)| *existing == dir) {
                Some(entry) => {
                    if mode == RecursiveMode::Recursive {
                        entry.1 = mode;
                    }
                }
                None => targets.push((dir, mode)),
            }
        }
        targets
    }
}

/// 每條規則在最後一次變更後安靜 `interval` 才觸發；期間再有變更就往後延
#[derive(Debug)]
pub struct Debouncer {
    interval: Duration,
    pending: HashMap<String, (Instant, PathBuf)>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: HashMap::new(),
        }
    }

    /// 記下變更並重設該規則的期限
    pub fn schedule(&mut self, key: &str, path: &Path, now: Instant) {
        self.pending
            .insert(key.to_string(), (now + self.interval, path.to_path_buf()));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(deadline, _)| *deadline).min()
    }

    /// 取出已到期的規則與觸發它的最後一個路徑，依期限排序
    pub fn take_due(&mut self, now: Instant) -> Vec<(String, PathBuf)> {
        let mut due: Vec<(Instant, String)> = self
            .pending
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now)
            .map(|(key, (deadline, _))| (*deadline, key.clone()))
            .collect();
        due.sort();

        due.into_iter()
            .filter_map(|(_, key)| self.pending.remove(&key).map(|(_, path)| (key, path)))
            .collect()
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Any)
    )
}

pub struct Watcher {
    plan: WatchPlan,
    debounce: Duration,
}

impl Watcher {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            plan: WatchPlan::from_config(config),
            debounce: Duration::from_millis(config.watch.debounce_ms),
        }
    }

    pub fn plan(&self) -> &WatchPlan {
        &self.plan
    }

    /// 監看直到 Ctrl-C
    pub async fn run(&self, ctx: &BuildContext) -> Result<()> {
        self.run_until(ctx, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Unable to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    pub async fn run_until<F>(&self, ctx: &BuildContext, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        for (dir, mode) in self.plan.watch_targets() {
            if !dir.exists() {
                tracing::warn!("⚠️ Not watching {} (missing)", dir.display());
                continue;
            }
            watcher.watch(&dir, mode)?;
            tracing::debug!("Watching {} ({:?})", dir.display(), mode);
        }
        tracing::info!("👀 Watching for changes, press Ctrl-C to stop");

        let runner = TaskRunner::new();
        let mut debouncer = Debouncer::new(self.debounce);
        let mut in_flight: FuturesUnordered<BoxFuture<'_, (String, bool)>> = FuturesUnordered::new();
        tokio::pin!(shutdown);

        loop {
            let next_deadline = debouncer.next_deadline();
            let wake = tokio::time::Instant::from_std(next_deadline.unwrap_or_else(Instant::now));

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("🛑 Stopping watcher");
                    break;
                }
                Some(received) = rx.recv() => {
                    let event = match received {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::warn!("Watch error: {}", e);
                            continue;
                        }
                    };
                    if !is_change(&event.kind) {
                        continue;
                    }
                    let now = Instant::now();
                    for path in &event.paths {
                        for rule in self.plan.rules_for(path) {
                            debouncer.schedule(&rule.name, path, now);
                        }
                    }
                }
                _ = tokio::time::sleep_until(wake), if next_deadline.is_some() => {
                    for (name, path) in debouncer.take_due(Instant::now()) {
                        let Some(rule) = self.plan.rules().iter().find(|r| r.name == name) else {
                            continue;
                        };
                        match &rule.action {
                            WatchAction::Run(node) => {
                                tracing::info!("File {} was modified, running tasks...", path.display());
                                let runner = &runner;
                                in_flight.push(
                                    async move {
                                        let ok = runner.execute(node, ctx).await.is_ok();
                                        (node.name().to_string(), ok)
                                    }
                                    .boxed(),
                                );
                            }
                            WatchAction::Reload => {
                                tracing::info!("🔄 File {} was modified, reload the page", path.display());
                            }
                        }
                    }
                }
                Some((name, ok)) = in_flight.next(), if !in_flight.is_empty() => {
                    // 失敗已由 ErrorReporter 回報，繼續監看
                    tracing::debug!("Watch run of '{}' finished (ok: {})", name, ok);
                }
            }
        }

        drop(watcher);
        Ok(())
    }
}

/// `watch` 任務：監看到 Ctrl-C，結束前停止長駐服務
#[derive(Debug, Default)]
pub struct WatchTask;

#[async_trait::async_trait]
impl Task for WatchTask {
    fn name(&self) -> &str {
        "watch"
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        Watcher::from_config(ctx.config()).run(ctx).await?;
        ctx.shutdown_services().await;
        Ok(TaskOutput::none())
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        let plan = WatchPlan::from_config(ctx.config());
        let names: Vec<&str> = plan.rules().iter().map(|r| r.name.as_str()).collect();
        format!("watch [{}]", names.join(", "))
    }
}
