use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "HATCHCAD_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub hatch: HatchConfig,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    /// 配置文件所在目录，相对路径以此为基准。
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `HATCHCAD_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 将配置中的相对路径解析到配置文件目录下。
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// 需要加载的 `.pat` 文件（已解析为完整路径）。
    pub fn pattern_files(&self) -> Vec<PathBuf> {
        self.patterns
            .files
            .iter()
            .map(|path| self.resolve_path(path))
            .collect()
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 填充校验与生成的数值阈值。
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HatchConfig {
    pub tolerance: f64,
    pub min_size: f64,
    pub min_area: f64,
    pub max_area: f64,
    pub max_segments: usize,
}

impl Default for HatchConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            min_size: 1e-6,
            min_area: 1e-6,
            max_area: 1e12,
            max_segments: 200_000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternConfig {
    /// 额外加载的 `.pat` 文件，同名图案覆盖内置定义。
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    /// 启动时加载的 JSON 文档；缺省时使用演示场景。
    #[serde(default)]
    pub sample_document: Option<PathBuf>,
    #[serde(default = "FrontendConfig::default_viewport_width")]
    pub viewport_width: f64,
    #[serde(default = "FrontendConfig::default_viewport_height")]
    pub viewport_height: f64,
    #[serde(default)]
    pub outline_invalid: bool,
}

impl FrontendConfig {
    fn default_viewport_width() -> f64 {
        200.0
    }

    fn default_viewport_height() -> f64 {
        150.0
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            sample_document: None,
            viewport_width: Self::default_viewport_width(),
            viewport_height: Self::default_viewport_height(),
            outline_invalid: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
