use crate::core::{BuildContext, Task, TaskOutput};
use crate::utils::error::{BuildError, Result};

/// 複製 node_modules 內的字型檔到 public/fonts
pub struct VendorFontsTask;

#[async_trait::async_trait]
impl Task for VendorFontsTask {
    fn name(&self) -> &str {
        "vendor_dependencies"
    }

    async fn run(&self, ctx: &BuildContext) -> Result<TaskOutput> {
        let config = ctx.config();
        let font_root = config.resolve(&config.vendor.font_root);
        let target = config.resolve(&config.project.fonts_dir);
        tokio::fs::create_dir_all(&target).await?;

        // fonts 列的是檔名；缺任何一個都算失敗
        let mut outputs = Vec::with_capacity(config.vendor.fonts.len());
        for name in &config.vendor.fonts {
            let source = font_root.join(name);
            let destination = target.join(name);
            tokio::fs::copy(&source, &destination).await.map_err(|e| {
                tracing::debug!("Font {} could not be copied: {}", source.display(), e);
                BuildError::IoError(std::io::Error::new(
                    e.kind(),
                    format!("{}: {}", source.display(), e),
                ))
            })?;
            outputs.push(destination);
        }

        tracing::debug!("Copied {} font files into {}", outputs.len(), target.display());
        Ok(TaskOutput::with_outputs(outputs))
    }

    fn describe(&self, ctx: &BuildContext) -> String {
        let config = ctx.config();
        format!(
            "copy {}/{{{}}} → {}",
            config.vendor.font_root,
            config.vendor.fonts.join(","),
            config.project.fonts_dir
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::BuildConfig;
    use crate::utils::reporter::ErrorReporter;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> BuildContext {
        let mut config = BuildConfig::default();
        config.project.root = dir.path().to_string_lossy().into_owned();
        BuildContext::new(config, ErrorReporter::log_only())
    }

    #[tokio::test]
    async fn test_copies_configured_font_files() {
        let dir = TempDir::new().unwrap();
        let fonts = dir.path().join("node_modules/font-awesome/fonts");
        std::fs::create_dir_all(&fonts).unwrap();
        for name in [
            "fontawesome-webfont.woff2",
            "fontawesome-webfont.woff",
            "fontawesome-webfont.ttf",
            "fontawesome-webfont.eot",
            "fontawesome-webfont.svg",
        ] {
            std::fs::write(fonts.join(name), name).unwrap();
        }

        let output = VendorFontsTask.run(&context(&dir)).await.unwrap();

        assert_eq!(output.outputs.len(), 3);
        let target = dir.path().join("public/fonts");
        assert_eq!(
            std::fs::read_to_string(target.join("fontawesome-webfont.woff2")).unwrap(),
            "fontawesome-webfont.woff2"
        );
        assert!(target.join("fontawesome-webfont.woff").exists());
        assert!(target.join("fontawesome-webfont.ttf").exists());
        assert!(!target.join("fontawesome-webfont.eot").exists());
        assert!(!target.join("fontawesome-webfont.svg").exists());
    }

    #[tokio::test]
    async fn test_missing_font_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let fonts = dir.path().join("node_modules/font-awesome/fonts");
        std::fs::create_dir_all(&fonts).unwrap();
        std::fs::write(fonts.join("fontawesome-webfont.woff2"), "woff2").unwrap();
        std::fs::write(fonts.join("fontawesome-webfont.woff"), "woff").unwrap();

        let err = VendorFontsTask.run(&context(&dir)).await.unwrap_err();

        match err {
            BuildError::IoError(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
                assert!(e.to_string().contains("fontawesome-webfont.ttf"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_font_root_fails() {
        let dir = TempDir::new().unwrap();
        assert!(VendorFontsTask.run(&context(&dir)).await.is_err());
    }

    #[test]
    fn test_describe_lists_file_names() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            VendorFontsTask.describe(&context(&dir)),
            "copy node_modules/font-awesome/fonts/{fontawesome-webfont.woff2,fontawesome-webfont.woff,fontawesome-webfont.ttf} → public/fonts"
        );
    }
}
