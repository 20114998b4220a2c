use crate::config::LocalStorage;
use crate::core::{BuildContext, Storage, Task, TaskOutput};
use crate::css;
use crate::utils::error::{BuildError, Result};
use crate::utils::process::run_tool;
use std::path::{Path, PathBuf};

/// `global.js` → `global.min.js`
pub fn min_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}.min.{}", stem, ext.to_string_lossy()),
        None => format!("{}.min", stem),
    };
    path.with_file_name(file_name)
}

fn is_minified(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains(".min."))
}

/// 刪除 dist 目錄中先前產生的 `*.min.*`
pub struct CleanMinifyTask;

#[async_trait::async_trait]
impl Task for CleanMinifyTask {
    fn name(&self) -> &str {
        "cleanMinify"
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        let dist = ctx.config().dist_dir();
        let mut entries = match tokio::fs::read_dir(&dist).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} does not exist yet, nothing to clean", dist.display());
                return Ok(TaskOutput::none());
            }
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && is_minified(&path) {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }

        tracing::debug!("🧹 Removed {} minified files", removed);
        Ok(TaskOutput::none())
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        format!("delete {}/*.min.*", ctx.config().project.dist_dir)
    }
}

pub struct MinifyJsTask;

#[async_trait::async_trait]
impl Task for MinifyJsTask {
    fn name(&self) -> &str {
        "minify_js"
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        let config = ctx.config();
        let input = config.dist_dir().join(&config.minify.js_input);
        let output = min_path(&input);

        run_tool(
            &config.tools.uglify,
            [
                input.into_os_string(),
                "-o".into(),
                output.clone().into_os_string(),
            ],
            &config.root(),
            None,
        )
        .await?;

        Ok(TaskOutput::single(output))
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        let config = ctx.config();
        let input = Path::new(&config.project.dist_dir).join(&config.minify.js_input);
        config.tools.uglify.command_line([
            input.as_os_str(),
            "-o".as_ref(),
            min_path(&input).as_os_str(),
        ])
    }
}

/// 以 CSS 解析器重新輸出壓縮版（保留 `/*!` 授權註解）
pub struct MinifyCssTask;

impl MinifyCssTask {
    pub fn minify(css: &str) -> Result<String> {
        Ok(css::parse_stylesheet(css)?.to_minified_string())
    }
}

#[async_trait::async_trait]
impl Task for MinifyCssTask {
    fn name(&self) -> &str {
        "minify_css"
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        let config = ctx.config();
        let storage = LocalStorage::new(config.dist_dir());
        let output = min_path(Path::new(&config.minify.css_input));
        let output_name = output.to_string_lossy();

        let bytes = storage.read_file(&config.minify.css_input).await?;
        let source = String::from_utf8(bytes).map_err(|e| BuildError::CssParseError {
            offset: e.utf8_error().valid_up_to(),
            message: format!("{} is not valid UTF-8", config.minify.css_input),
        })?;

        let minified = Self::minify(&source)?;
        storage.write_file(&output_name, minified.as_bytes()).await?;

        tracing::debug!(
            "{}: {} → {} bytes",
            config.minify.css_input,
            source.len(),
            minified.len()
        );
        Ok(TaskOutput::single(storage.full_path(&output_name)))
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        let config = ctx.config();
        format!(
            "minify {0}/{1} → {0}/{2}",
            config.project.dist_dir,
            config.minify.css_input,
            min_path(Path::new(&config.minify.css_input)).display()
        )
    }
}
