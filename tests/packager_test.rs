use anyhow::Result;
use async_trait::async_trait;
use resume_assets::core::Renderer;
use resume_assets::css::data_uri;
use resume_assets::utils::error::BuildError;
use resume_assets::{BuildConfig, Packager};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const FONT_BYTES: &[u8] = &[0x77, 0x4f, 0x46, 0x32, 0x00, 0x01, 0xfe, 0xff];

const GLOBAL_CSS: &str = r#"/*!
 *  Font Awesome 4.7.0 by @davegandy - http://fontawesome.io - @fontawesome
 *  License - http://fontawesome.io/license (Font: SIL OFL 1.1, CSS: MIT License)
 */
@font-face {
  font-family: 'FontAwesome';
  src: url('../fonts/fontawesome-webfont.eot?v=4.7.0');
  src: url('../fonts/fontawesome-webfont.eot?#iefix&v=4.7.0') format('embedded-opentype'),
       url('../fonts/fontawesome-webfont.woff2?v=4.7.0') format('woff2'),
       url('../fonts/fontawesome-webfont.woff?v=4.7.0') format('woff'),
       url('../fonts/fontawesome-webfont.ttf?v=4.7.0') format('truetype'),
       url('../fonts/fontawesome-webfont.svg?v=4.7.0#fontawesomeregular') format('svg');
  font-weight: normal;
  font-style: normal;
}
/* layout */
body { margin: 0; }
.fa { display: inline-block; font: normal normal normal 14px/1 FontAwesome; }
.fa-github:before { content: "\f09b"; }
.fa-twitter:before { content: "\f099"; }
@media (max-width: 600px) {
  .resume-header { padding: 0 1em; }
  .never-used { color: red; }
}
"#;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<!--style:public/dist/global.min.css-->
</head>
<body>
<header class="resume-header"><i class="fa fa-github"></i></header>
<!--
*Please see the attached CSS file*
-->
</body>
</html>"#;

struct StaticRenderer(String);

#[async_trait]
impl Renderer for StaticRenderer {
    async fn render(&self) -> resume_assets::Result<String> {
        Ok(self.0.clone())
    }
}

fn project() -> Result<(TempDir, Arc<BuildConfig>)> {
    let dir = TempDir::new()?;
    std::fs::create_dir_all(dir.path().join("public/dist"))?;
    std::fs::create_dir_all(dir.path().join("fonts"))?;
    std::fs::write(dir.path().join("public/dist/global.min.css"), GLOBAL_CSS)?;
    std::fs::write(dir.path().join("fonts/FontAwesome-subset.woff2"), FONT_BYTES)?;

    let mut config = BuildConfig::default();
    config.project.root = dir.path().to_string_lossy().into_owned();
    Ok((dir, Arc::new(config)))
}

fn embedded_font(html: &str) -> Option<(String, Vec<u8>)> {
    let start = html.find("url(data:")? + "url(".len();
    let end = start + html[start..].find(')')?;
    data_uri::decode(&html[start..end])
}

#[tokio::test]
async fn test_package_produces_standalone_document() -> Result<()> {
    let (dir, config) = project()?;

    let outcome = Packager::from_config(config)
        .package(&StaticRenderer(PAGE.to_string()))
        .await?;

    assert_eq!(outcome.output_path, dir.path().join("index.html"));
    let html = std::fs::read_to_string(dir.path().join("index.html"))?;

    assert!(html.contains("<style>"));
    assert!(!html.contains("<!--style:"));
    assert!(!html.contains("<link"));
    assert!(!html.contains("*Please see the attached CSS file*"));
    assert!(html.contains("Font Awesome 4.7.0 by @davegandy"));
    assert!(html.contains("CSS: MIT License"));

    for legacy in ["embedded-opentype", "format('woff')", "truetype", "format('svg')", ".eot", ".ttf"] {
        assert!(!html.contains(legacy), "{} left in output", legacy);
    }

    assert_eq!(
        embedded_font(&html),
        Some(("font/woff2".to_string(), FONT_BYTES.to_vec()))
    );

    assert!(html.contains(".fa-github:before"));
    assert!(html.contains(".resume-header"));
    assert!(!html.contains(".fa-twitter"));
    assert!(!html.contains(".never-used"));
    assert_eq!(outcome.purged_selectors, 2);
    assert_eq!(outcome.licenses.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_license_is_not_left_inside_style() -> Result<()> {
    let (dir, config) = project()?;
    Packager::from_config(config)
        .package(&StaticRenderer(PAGE.to_string()))
        .await?;

    let html = std::fs::read_to_string(dir.path().join("index.html"))?;
    let style_start = html.find("<style>").unwrap_or(0);
    let style_end = html.find("</style>").unwrap_or(html.len());
    assert!(!html[style_start..style_end].contains("/*!"));
    Ok(())
}

#[tokio::test]
async fn test_missing_marker_writes_nothing() -> Result<()> {
    let (dir, config) = project()?;
    let page = PAGE.replace("<!--style:public/dist/global.min.css-->", "");

    let err = Packager::from_config(config)
        .package(&StaticRenderer(page))
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::MarkerMissing { .. }));
    assert!(!dir.path().join("index.html").exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_placeholder_writes_nothing() -> Result<()> {
    let (dir, config) = project()?;
    let page = PAGE.replace("*Please see the attached CSS file*", "");

    let err = Packager::from_config(config)
        .package(&StaticRenderer(page))
        .await
        .unwrap_err();

    match err {
        BuildError::MarkerMissing { marker } => {
            assert_eq!(marker, "*Please see the attached CSS file*")
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!dir.path().join("index.html").exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_stylesheet_is_io_error() -> Result<()> {
    let (dir, config) = project()?;
    std::fs::remove_file(dir.path().join("public/dist/global.min.css"))?;

    let err = Packager::from_config(config)
        .package(&StaticRenderer(PAGE.to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::IoError(_)));
    assert!(!dir.path().join("index.html").exists());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_php_renderer_runs_configured_command() -> Result<()> {
    use resume_assets::utils::process::ToolConfig;
    use resume_assets::PhpRenderer;

    let (dir, config) = project()?;
    std::fs::write(dir.path().join("page.html"), PAGE)?;

    let mut config = (*config).clone();
    // `sh -c 'cat page.html' php public/index.php --one-file`
    config.tools.php = ToolConfig::new("sh", &["-c", "cat page.html", "php"]);
    let config = Arc::new(config);

    let renderer = PhpRenderer::from_config(&config);
    let outcome = Packager::from_config(config).package(&renderer).await?;

    assert!(Path::new(&outcome.output_path).exists());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_renderer_output_limit() -> Result<()> {
    use resume_assets::utils::process::ToolConfig;
    use resume_assets::PhpRenderer;

    let (dir, config) = project()?;
    let mut config = (*config).clone();
    config.tools.php = ToolConfig::new("sh", &["-c", "head -c 4096 /dev/zero", "php"]);
    config.package.max_output_bytes = 1024;
    let config = Arc::new(config);

    let err = Packager::from_config(config.clone())
        .package(&PhpRenderer::from_config(&config))
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::OutputTooLarge { limit: 1024, .. }));
    assert!(!dir.path().join("index.html").exists());
    Ok(())
}
