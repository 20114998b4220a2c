use clap::Parser;
use resume_assets::config::cli::Cli;
use resume_assets::utils::error::BuildError;
use resume_assets::utils::reporter::{DesktopNotifier, ErrorReporter};
use resume_assets::utils::{logger, validation::Validate};
use resume_assets::{graph_for, BuildConfig, BuildContext, TaskRunner};
use std::sync::Arc;

fn fail(e: &BuildError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1))
}

fn load_config(cli: &Cli) -> Result<BuildConfig, BuildError> {
    let mut config = BuildConfig::load(cli.config.as_deref(), cli.root.as_deref())?;
    if let Some(root) = &cli.root {
        config.project.root = root.to_string_lossy().into_owned();
    }

    // 工具的工作目錄與 notify 回報的路徑都是絕對路徑
    let root = std::fs::canonicalize(&config.project.root).map_err(|e| {
        BuildError::InvalidConfigValueError {
            field: "project.root".to_string(),
            value: config.project.root.clone(),
            reason: e.to_string(),
        }
    })?;
    config.project.root = root.to_string_lossy().into_owned();
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let task = cli.task();
    tracing::info!("Starting resume-assets '{}'", task.task_name());
    if cli.verbose {
        tracing::debug!("CLI: {:?}", cli);
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load configuration: {}", e);
            fail(&e);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        fail(&e);
    }

    let notifications = config.notifications.enabled && !cli.no_notify;
    let notifier = DesktopNotifier::new(config.tools.notifier.clone(), config.root());
    let reporter = ErrorReporter::new(Arc::new(notifier), notifications);
    let ctx = BuildContext::new(config, reporter);

    let graph = match graph_for(task.task_name()) {
        Ok(graph) => graph,
        Err(e) => fail(&e),
    };

    if cli.dry_run {
        println!("{}", graph.plan(&ctx));
        return Ok(());
    }

    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }
    let runner = TaskRunner::new().with_monitoring(cli.monitor);

    let outcome = runner.execute(&graph, &ctx).await;

    // connect 單獨執行時，伺服器持續到 Ctrl-C
    if outcome.is_ok() && ctx.has_services() {
        tracing::info!("Press Ctrl-C to stop {}", ctx.service_names().join(", "));
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Unable to listen for Ctrl-C: {}", e);
        }
    }
    ctx.shutdown_services().await;

    match outcome {
        Ok(reports) => {
            let summary = TaskRunner::summary(&reports);
            tracing::debug!("Summary: {}", serde_json::to_string(&summary)?);
            tracing::info!(
                "✅ '{}' completed ({} tasks, run {})",
                graph.name(),
                reports.len(),
                ctx.run_id
            );
            println!("✅ {} completed successfully!", graph.name());
        }
        Err(e) => {
            // 葉節點已經回報過，這裡只決定退出碼
            tracing::error!(
                "❌ '{}' failed: {} (Category: {:?}, Severity: {:?})",
                graph.name(),
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());

            let code = e.exit_code();
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
