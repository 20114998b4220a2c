use crate::config::toml_config::BuildConfig;
use crate::core::{BuildContext, Task, TaskOutput};
use crate::utils::error::Result;
use crate::utils::process::run_tool;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 列出目錄下指定副檔名的檔案（已排序）
pub(crate) fn collect_sources(dir: &Path, ext: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(dir).sort_by_file_name();
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str()) == Some(ext)
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Sass 原始檔與輸出檔的對應（略過 `_partial.scss`）
pub fn sass_jobs(config: &BuildConfig) -> Result<Vec<(PathBuf, PathBuf)>> {
    let sass_dir = config.resolve(&config.sources.sass_dir);
    let dist = config.dist_dir();

    let jobs = collect_sources(&sass_dir, "scss", true)?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('_'))
        })
        .map(|input| {
            let relative = input.strip_prefix(&sass_dir).unwrap_or(&input).to_path_buf();
            let output = dist.join(relative).with_extension("css");
            (input, output)
        })
        .collect();
    Ok(jobs)
}

pub struct SassTask;

#[async_trait::async_trait]
impl Task for SassTask {
    fn name(&self) -> &str {
        "sass"
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        let config = ctx.config();
        let root = config.root();
        let mut outputs = Vec::new();

        for (input, output) in sass_jobs(config)? {
            if let Some(parent) = output.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tracing::debug!("sass {} → {}", input.display(), output.display());
            run_tool(
                &config.tools.sass,
                ["--no-source-map".into(), input.into_os_string(), output.clone().into_os_string()],
                &root,
                None,
            )
            .await?;

            if let Some(prefixer) = &config.tools.autoprefixer {
                run_tool(prefixer, [output.clone().into_os_string()], &root, None).await?;
            }
            outputs.push(output);
        }

        if outputs.is_empty() {
            tracing::warn!("No Sass entry points under {}", config.sources.sass_dir);
        }
        Ok(TaskOutput::with_outputs(outputs))
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        let config = ctx.config();
        format!(
            "{} --no-source-map {}/**/*.scss → {}",
            config.tools.sass.command_line(Vec::<String>::new()),
            config.sources.sass_dir,
            config.project.dist_dir
        )
    }
}

/// 應用程式主程式 `global.js`
pub struct TypeScriptTask;

#[async_trait::async_trait]
impl Task for TypeScriptTask {
    fn name(&self) -> &str {
        "typescript"
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        let config = ctx.config();
        let inputs = collect_sources(&config.resolve(&config.sources.ts_dir), "ts", false)?;
        if inputs.is_empty() {
            tracing::warn!("No TypeScript sources under {}", config.sources.ts_dir);
            return Ok(TaskOutput::none());
        }

        let output = config.dist_dir().join(&config.typescript.app.out_file);
        let mut args = config.typescript.app.compiler_args(&output);
        args.extend(inputs.iter().map(|p| p.to_string_lossy().into_owned()));

        run_tool(&config.tools.tsc, args, &config.root(), None).await?;
        Ok(TaskOutput::single(output))
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        let config = ctx.config();
        let output = config.dist_dir().join(&config.typescript.app.out_file);
        format!(
            "{} {}/*.ts",
            config
                .tools
                .tsc
                .command_line(config.typescript.app.compiler_args(&output)),
            config.sources.ts_dir
        )
    }
}

/// `sw.js` 輸出到專案根目錄，編譯後再壓縮
pub struct ServiceWorkerTask;

#[async_trait::async_trait]
impl Task for ServiceWorkerTask {
    fn name(&self) -> &str {
        "serviceWorker"
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        let config = ctx.config();
        let root = config.root();
        let input = config.resolve(&config.sources.service_worker);
        let output = config.resolve(&config.typescript.service_worker.out_file);

        let mut args = config.typescript.service_worker.compiler_args(&output);
        args.push(input.to_string_lossy().into_owned());
        run_tool(&config.tools.tsc, args, &root, None).await?;

        let out = output.to_string_lossy().into_owned();
        run_tool(&config.tools.uglify, [out.clone(), "-o".to_string(), out], &root, None).await?;

        Ok(TaskOutput::single(output))
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        let config = ctx.config();
        format!(
            "tsc {} → {} | {}",
            config.sources.service_worker,
            config.typescript.service_worker.out_file,
            config.tools.uglify.program
        )
    }
}
