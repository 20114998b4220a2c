use crate::config::toml_config::BuildConfig;
use crate::config::LocalStorage;
use crate::core::{BuildContext, Renderer, Storage, Task, TaskOutput};
use crate::css::{self, data_uri, HtmlVocabulary};
use crate::domain::model::PackageOutcome;
use crate::utils::error::{BuildError, Result};
use crate::utils::process::{run_tool, ToolConfig};
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

pub const STYLE_MARKER: &str = "<!--style:PATH-->";

fn style_marker_pattern() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"<!--style:(.+?)-->").expect("valid regex"))
}

/// 找到第一個 `<!--style:PATH-->`，回傳整段標記的範圍與 PATH
pub fn find_style_marker(html: &str) -> Result<(Range<usize>, String)> {
    let caps = style_marker_pattern()
        .captures(html)
        .ok_or_else(|| BuildError::MarkerMissing {
            marker: STYLE_MARKER.to_string(),
        })?;
    let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
    let path = caps[1].trim().to_string();
    Ok((whole, path))
}

/// 執行 `php <script> --one-file` 取得完整 HTML
#[derive(Debug, Clone)]
pub struct PhpRenderer {
    tool: ToolConfig,
    args: Vec<String>,
    cwd: PathBuf,
    max_output_bytes: usize,
}

impl PhpRenderer {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            tool: config.tools.php.clone(),
            args: vec![
                config.package.renderer_script.clone(),
                config.package.renderer_flag.clone(),
            ],
            cwd: config.root(),
            max_output_bytes: config.package.max_output_bytes,
        }
    }

    pub fn command_line(&self) -> String {
        self.tool.command_line(&self.args)
    }
}

#[async_trait::async_trait]
impl Renderer for PhpRenderer {
    async fn render(&self) -> Result<String> {
        let output = run_tool(
            &self.tool,
            self.args.clone(),
            &self.cwd,
            Some(self.max_output_bytes),
        )
        .await?;
        Ok(output.stdout)
    }
}

/// CSS after every packaging transform.
#[derive(Debug, Clone)]
pub struct ProcessedCss {
    pub css: String,
    pub licenses: Vec<String>,
    pub purged_selectors: usize,
}

/// 授權註解抽出 → 清除未使用的選擇器 → 移除舊字型格式 → 內嵌 woff2 → 壓縮
pub fn process_css(css: &str, html: &str, font: &[u8], font_mime: &str) -> Result<ProcessedCss> {
    let mut sheet = css::parse_stylesheet(css)?;

    let licenses = css::extract_licenses(&mut sheet);
    let purged_selectors = css::purge(&mut sheet, &HtmlVocabulary::from_html(html));
    let stripped = css::strip_legacy_font_sources(&mut sheet);
    let embedded = css::embed_woff2(&mut sheet, &data_uri::encode(font, font_mime));

    tracing::debug!(
        "CSS: {} licenses, {} selectors purged, {} legacy font sources removed, {} fonts embedded",
        licenses.len(),
        purged_selectors,
        stripped,
        embedded
    );

    Ok(ProcessedCss {
        css: sheet.to_minified_string(),
        licenses,
        purged_selectors,
    })
}

pub struct Packager<S: Storage> {
    config: Arc<BuildConfig>,
    storage: S,
}

impl Packager<LocalStorage> {
    pub fn from_config(config: Arc<BuildConfig>) -> Self {
        let storage = LocalStorage::new(config.root());
        Self::new(config, storage)
    }
}

impl<S: Storage> Packager<S> {
    pub fn new(config: Arc<BuildConfig>, storage: S) -> Self {
        Self { config, storage }
    }

    pub async fn package(&self, renderer: &dyn Renderer) -> Result<PackageOutcome> {
        let package = &self.config.package;

        tracing::info!("📄 Generating HTML...");
        let html = renderer.render().await?;

        // 兩個標記都必須存在，否則不讀任何檔案也不寫輸出
        let (_, css_path) = find_style_marker(&html)?;
        if !html.contains(&package.license_placeholder) {
            return Err(BuildError::MarkerMissing {
                marker: package.license_placeholder.clone(),
            });
        }

        tracing::info!("🎨 Reading CSS from {}", css_path);
        let css_file = self.config.resolve(&css_path);
        let font_file = self.config.resolve(&package.font_subset);
        let css_name = css_file.to_string_lossy().into_owned();
        let font_name = font_file.to_string_lossy().into_owned();
        let (css_bytes, font_bytes) = tokio::try_join!(
            self.storage.read_file(&css_name),
            self.storage.read_file(&font_name),
        )?;

        let css = String::from_utf8(css_bytes).map_err(|e| BuildError::CssParseError {
            offset: e.utf8_error().valid_up_to(),
            message: format!("{} is not valid UTF-8", css_path),
        })?;

        let processed = process_css(&css, &html, &font_bytes, data_uri::mime_for(&font_file))?;
        let document = assemble_document(
            &html,
            &processed.css,
            &package.license_placeholder,
            &css::license_block(&processed.licenses),
        )?;

        let output_path = self.config.resolve(&package.output);
        self.storage
            .write_file(&output_path.to_string_lossy(), document.as_bytes())
            .await?;

        tracing::info!(
            "📦 Wrote {} ({} bytes of inline CSS, {} licenses)",
            output_path.display(),
            processed.css.len(),
            processed.licenses.len()
        );

        Ok(PackageOutcome {
            output_path,
            css_bytes: processed.css.len(),
            licenses: processed.licenses,
            purged_selectors: processed.purged_selectors,
        })
    }
}

/// 以 `<style>` 取代樣式標記、以授權文字取代佔位字串（各只取代第一個）
pub fn assemble_document(
    html: &str,
    css: &str,
    license_placeholder: &str,
    licenses: &str,
) -> Result<String> {
    if !html.contains(license_placeholder) {
        return Err(BuildError::MarkerMissing {
            marker: license_placeholder.to_string(),
        });
    }
    let html = html.replacen(license_placeholder, licenses, 1);

    let (marker, _) = find_style_marker(&html)?;
    let mut document = String::with_capacity(html.len() + css.len() + 16);
    document.push_str(&html[..marker.start]);
    document.push_str("<style>");
    document.push_str(css);
    document.push_str("</style>");
    document.push_str(&html[marker.end..]);
    Ok(document)
}

/// `one-file` 的最後一步
pub struct PackingTask;

#[async_trait::async_trait]
impl Task for PackingTask {
    fn name(&self) -> &str {
        "packing"
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        let renderer = PhpRenderer::from_config(ctx.config());
        let outcome = Packager::from_config(ctx.config.clone())
            .package(&renderer)
            .await?;
        if outcome.purged_selectors > 0 {
            tracing::info!("🧹 Purged {} unused selectors", outcome.purged_selectors);
        }
        Ok(TaskOutput::single(outcome.output_path))
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        let config = ctx.config();
        format!(
            "{} | inline CSS + {} → {}",
            PhpRenderer::from_config(config).command_line(),
            config.package.font_subset,
            Path::new(&config.package.output).display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_style_marker() {
        let (range, path) =
            find_style_marker("<head><!--style:public/dist/global.min.css--><!-- x --></head>")
                .unwrap();
        assert_eq!(path, "public/dist/global.min.css");
        assert_eq!(range, 6..45);

        assert!(matches!(
            find_style_marker("<head></head>"),
            Err(BuildError::MarkerMissing { .. })
        ));
    }

    #[test]
    fn test_assemble_document() {
        let doc = assemble_document(
            "<head><!--style:a.css--></head><!--*Please see the attached CSS file*-->",
            "a{b:c}",
            "*Please see the attached CSS file*",
            "\n MIT \n",
        )
        .unwrap();
        assert_eq!(doc, "<head><style>a{b:c}</style></head><!--\n MIT \n-->");
    }

    #[test]
    fn test_assemble_requires_placeholder() {
        let err = assemble_document("<!--style:a.css-->", "", "*placeholder*", "").unwrap_err();
        match err {
            BuildError::MarkerMissing { marker } => assert_eq!(marker, "*placeholder*"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_process_css() {
        let css = "/*!\n * Font Awesome 4.7.0 by @davegandy\n */\
            @font-face{font-family:'FontAwesome';src:url('../fonts/fontawesome-webfont.woff2?v=4.7.0') format('woff2'),url('../fonts/fontawesome-webfont.woff?v=4.7.0') format('woff')}\
            .fa{display:inline-block}.unused{color:red}";
        let html = "<i class=\"fa\"></i>";

        let processed = process_css(css, html, b"wOF2", "font/woff2").unwrap();

        assert_eq!(processed.licenses, vec!["\n * Font Awesome 4.7.0 by @davegandy\n "]);
        assert_eq!(processed.purged_selectors, 1);
        assert_eq!(
            processed.css,
            "@font-face{font-family:'FontAwesome';src:url(data:font/woff2;base64,d09GMg==) format('woff2')}.fa{display:inline-block}"
        );
    }
}
