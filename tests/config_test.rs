use resume_assets::utils::error::BuildError;
use resume_assets::utils::reporter::ErrorReporter;
use resume_assets::utils::validation::Validate;
use resume_assets::{graph_for, BuildConfig, BuildContext, TaskRunner};
use std::path::Path;
use tempfile::TempDir;

/// 以 sh 模擬 sass / tsc / uglifyjs，讓整個 minify 流程能在測試中跑完
fn fake_toolchain(root: &Path) -> String {
    format!(
        r#"
[project]
root = "{root}"

[tools.sass]
program = "sh"
args = ["-c", 'cp "$2" "$3"', "sass"]

[tools.tsc]
program = "sh"
args = ["-c", 'while [ $# -gt 0 ]; do if [ "$1" = --outFile ]; then printf "var app = 1;\n" > "$2"; fi; shift; done', "tsc"]

[tools.uglify]
program = "sh"
args = ["-c", 'cat "$1" > "$3.part" && mv "$3.part" "$3"', "uglifyjs"]

[watch]
debounce_ms = 100
"#,
        root = root.display()
    )
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[test]
fn test_fake_toolchain_config_is_valid() {
    let dir = TempDir::new().unwrap();
    let config = BuildConfig::from_toml_str(&fake_toolchain(dir.path())).unwrap();

    assert!(config.validate().is_ok());
    assert_eq!(config.tools.sass.program, "sh");
    assert_eq!(config.watch.debounce_ms, 100);
    assert_eq!(config.server.port, 8080);
}

#[test]
fn test_bad_host_is_rejected() {
    let config = BuildConfig::from_toml_str("[server]\nhost = \"bad host\"\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_unknown_task_name() {
    let err = graph_for("deploy").unwrap_err();
    assert!(matches!(err, BuildError::UnknownTask { .. }));
    assert!(err.user_friendly_message().contains("deploy"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_minify_graph_end_to_end() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "front/sass/global.scss", "/*! MIT */\nbody {\n  margin: 0;\n}\n");
    write(root, "front/sass/_mixins.scss", "");
    write(root, "front/ts/app.ts", "let app = 1;");
    write(root, "public/sw.ts", "self.addEventListener('fetch', () => {});");
    for font in ["woff2", "woff", "ttf", "eot"] {
        let name = format!("node_modules/font-awesome/fonts/fontawesome-webfont.{}", font);
        write(root, &name, font);
    }
    write(root, "public/dist/stale.min.js", "old");

    let config = BuildConfig::from_toml_str(&fake_toolchain(root)).unwrap();
    let ctx = BuildContext::new(config, ErrorReporter::log_only());
    let graph = graph_for("minify").unwrap();

    let reports = TaskRunner::new().execute(&graph, &ctx).await.unwrap();

    let mut names: Vec<&str> = reports.iter().map(|r| r.task_name.as_str()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "cleanMinify",
            "minify_css",
            "minify_js",
            "sass",
            "serviceWorker",
            "typescript",
            "vendor_dependencies",
        ]
    );

    let dist = root.join("public/dist");
    assert!(!dist.join("stale.min.js").exists());
    assert!(!dist.join("_mixins.css").exists());
    assert_eq!(
        std::fs::read_to_string(dist.join("global.min.css")).unwrap(),
        "/*! MIT */body{margin:0}"
    );
    assert_eq!(
        std::fs::read_to_string(dist.join("global.min.js")).unwrap(),
        "var app = 1;\n"
    );
    assert!(root.join("sw.js").exists());
    assert!(root.join("public/fonts/fontawesome-webfont.woff2").exists());
    assert!(root.join("public/fonts/fontawesome-webfont.ttf").exists());
    assert!(!root.join("public/fonts/fontawesome-webfont.eot").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_compiler_stops_minify() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "front/sass/global.scss", "body {");
    write(root, "front/ts/app.ts", "");
    write(root, "public/sw.ts", "");
    for font in ["woff2", "woff", "ttf"] {
        let name = format!("node_modules/font-awesome/fonts/fontawesome-webfont.{}", font);
        write(root, &name, font);
    }

    let mut config = BuildConfig::from_toml_str(&fake_toolchain(root)).unwrap();
    config.tools.sass = resume_assets::utils::process::ToolConfig::new(
        "sh",
        &["-c", "echo 'Error: expected \"}\".' >&2; exit 65", "sass"],
    );
    let ctx = BuildContext::new(config, ErrorReporter::log_only());

    let err = TaskRunner::new()
        .execute(&graph_for("minify").unwrap(), &ctx)
        .await
        .unwrap_err();

    match err {
        BuildError::TaskFailed { ref task, ref details, .. } => {
            assert_eq!(task, "sass");
            // 工具是 sh，細節裡只看得到編譯器自己的 stderr
            assert!(details.contains("Tool 'sh' exited"));
            assert!(details.contains("expected \"}\""));
        }
        ref other => panic!("unexpected error: {:?}", other),
    }
    // 編譯失敗可修正後重跑
    assert_eq!(err.exit_code(), 2);
    // 壓縮階段不會執行
    assert!(!root.join("public/dist/global.min.js").exists());
    assert!(!root.join("public/dist/global.min.css").exists());
}
