use crate::utils::error::{BuildError, Result};
use crate::utils::process::ToolConfig;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "assets.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub project: ProjectConfig,
    pub sources: SourcesConfig,
    pub tools: ToolsConfig,
    pub typescript: TypeScriptConfig,
    pub vendor: VendorConfig,
    pub minify: MinifyConfig,
    pub server: ServerConfig,
    pub package: PackageConfig,
    pub watch: WatchConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub root: String,
    pub public_dir: String,
    pub dist_dir: String,
    pub fonts_dir: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            public_dir: "public".to_string(),
            dist_dir: "public/dist".to_string(),
            fonts_dir: "public/fonts".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub sass_dir: String,
    pub ts_dir: String,
    pub service_worker: String,
    pub json_dir: String,
    pub php_dir: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            sass_dir: "front/sass".to_string(),
            ts_dir: "front/ts".to_string(),
            service_worker: "public/sw.ts".to_string(),
            json_dir: "front/json".to_string(),
            php_dir: "src".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub sass: ToolConfig,
    pub tsc: ToolConfig,
    pub uglify: ToolConfig,
    pub php: ToolConfig,
    pub composer: ToolConfig,
    pub notifier: ToolConfig,
    pub autoprefixer: Option<ToolConfig>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sass: ToolConfig::new("sass", &[]),
            tsc: ToolConfig::new("tsc", &[]),
            uglify: ToolConfig::new(
                "uglifyjs",
                &["--mangle", "toplevel", "--compress", "drop_console", "--warn"],
            ),
            php: ToolConfig::new("php", &[]),
            composer: ToolConfig::new("composer", &[]),
            notifier: ToolConfig::new("notify-send", &["--urgency=critical"]),
            autoprefixer: None,
        }
    }
}

/// 一個 tsc 輸出檔的編譯選項
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsBundleConfig {
    pub out_file: String,
    pub target: String,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub lib: Vec<String>,
    #[serde(default)]
    pub downlevel_iteration: bool,
    #[serde(default = "default_true")]
    pub no_implicit_any: bool,
}

impl TsBundleConfig {
    /// 轉成 tsc 命令列參數（不含輸入檔）
    pub fn compiler_args(&self, out_path: &Path) -> Vec<String> {
        let mut args = Vec::new();
        if self.no_implicit_any {
            args.push("--noImplicitAny".to_string());
        }
        args.push("--outFile".to_string());
        args.push(out_path.to_string_lossy().into_owned());
        if !self.lib.is_empty() {
            args.push("--lib".to_string());
            args.push(self.lib.join(","));
        }
        if self.downlevel_iteration {
            args.push("--downlevelIteration".to_string());
        }
        args.push("--target".to_string());
        args.push(self.target.clone());
        if let Some(module) = &self.module {
            args.push("--module".to_string());
            args.push(module.clone());
        }
        args
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeScriptConfig {
    pub app: TsBundleConfig,
    pub service_worker: TsBundleConfig,
}

impl Default for TypeScriptConfig {
    fn default() -> Self {
        Self {
            app: TsBundleConfig {
                out_file: "global.js".to_string(),
                target: "ES5".to_string(),
                module: Some("amd".to_string()),
                lib: vec![
                    "es2018".to_string(),
                    "dom".to_string(),
                    "dom.iterable".to_string(),
                ],
                downlevel_iteration: true,
                no_implicit_any: true,
            },
            service_worker: TsBundleConfig {
                out_file: "sw.js".to_string(),
                target: "ES6".to_string(),
                module: None,
                lib: Vec::new(),
                downlevel_iteration: false,
                no_implicit_any: true,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    pub font_root: String,
    pub fonts: Vec<String>,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            font_root: "node_modules/font-awesome/fonts".to_string(),
            fonts: vec![
                "fontawesome-webfont.woff2".to_string(),
                "fontawesome-webfont.woff".to_string(),
                "fontawesome-webfont.ttf".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinifyConfig {
    pub js_input: String,
    pub css_input: String,
}

impl Default for MinifyConfig {
    fn default() -> Self {
        Self {
            js_input: "global.js".to_string(),
            css_input: "global.css".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    pub renderer_script: String,
    pub renderer_flag: String,
    pub font_subset: String,
    pub output: String,
    pub license_placeholder: String,
    pub max_output_bytes: usize,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            renderer_script: "public/index.php".to_string(),
            renderer_flag: "--one-file".to_string(),
            font_subset: "fonts/FontAwesome-subset.woff2".to_string(),
            output: "index.html".to_string(),
            license_placeholder: "*Please see the attached CSS file*".to_string(),
            max_output_bytes: 500 << 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub debounce_ms: u64,
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            ignore: vec![
                "node_modules".to_string(),
                ".git".to_string(),
                "vendor".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl BuildConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BuildError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| BuildError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 指定的檔案必須存在；未指定時在專案根目錄（預設為目前目錄）找
    /// `assets.toml`，找不到就使用預設值
    pub fn load(explicit: Option<&Path>, root: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let default_file = root.unwrap_or(Path::new(".")).join(DEFAULT_CONFIG_FILE);
        if default_file.exists() {
            tracing::debug!("Loading {}", default_file.display());
            Self::from_file(&default_file)
        } else {
            tracing::debug!("No {} found, using built-in defaults", default_file.display());
            Ok(Self::default())
        }
    }

    /// 替換環境變數 (例如 ${HOME})，未定義的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.project.root)
    }

    /// 以專案根目錄解析相對路徑
    pub fn resolve<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.root().join(relative)
        }
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.resolve(&self.project.dist_dir)
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}/", self.server.host, self.server.port)
    }

    pub fn validate_config(&self) -> Result<()> {
        let paths = [
            ("project.root", &self.project.root),
            ("project.public_dir", &self.project.public_dir),
            ("project.dist_dir", &self.project.dist_dir),
            ("project.fonts_dir", &self.project.fonts_dir),
            ("sources.sass_dir", &self.sources.sass_dir),
            ("sources.ts_dir", &self.sources.ts_dir),
            ("sources.service_worker", &self.sources.service_worker),
            ("vendor.font_root", &self.vendor.font_root),
            ("package.renderer_script", &self.package.renderer_script),
            ("package.font_subset", &self.package.font_subset),
            ("package.output", &self.package.output),
        ];
        for (field, value) in paths {
            validation::validate_path(field, value)?;
        }

        let tools = [
            ("tools.sass", &self.tools.sass),
            ("tools.tsc", &self.tools.tsc),
            ("tools.uglify", &self.tools.uglify),
            ("tools.php", &self.tools.php),
            ("tools.composer", &self.tools.composer),
            ("tools.notifier", &self.tools.notifier),
        ];
        for (field, tool) in tools {
            validation::validate_non_empty_string(field, &tool.program)?;
        }

        validation::validate_range("server.port", self.server.port, 1, 65535)?;
        validation::validate_http_url("server.host", &self.server_url())?;
        validation::validate_range("watch.debounce_ms", self.watch.debounce_ms, 0, 60_000)?;
        validation::validate_non_empty_list("vendor.fonts", &self.vendor.fonts)?;
        validation::validate_non_empty_string(
            "package.license_placeholder",
            &self.package.license_placeholder,
        )?;
        validation::validate_range(
            "package.max_output_bytes",
            self.package.max_output_bytes,
            1024,
            usize::MAX,
        )?;

        if self.typescript.app.out_file == self.typescript.service_worker.out_file
            && self.project.dist_dir == self.project.root
        {
            return Err(BuildError::ConfigValidationError {
                field: "typescript".to_string(),
                message: "app and service worker bundles would overwrite each other".to_string(),
            });
        }

        Ok(())
    }
}

impl Validate for BuildConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
