//! 配置 - 可选的 JSON 配置文件与时长解析
//!
//! 配置文件默认位于 `~/.config/ics-notify/config.json`，字段全部可选：
//!
//! ```json
//! {
//!   "output_format": "{{ date }} {{ summary }}\n",
//!   "date_format": "%Y-%m-%d %H:%M",
//!   "duration": "12h",
//!   "wait_min": 60,
//!   "wait_max": 900,
//!   "fetch_timeout_secs": 30
//! }
//! ```
//!
//! 命令行参数优先于配置文件。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// 默认窗口长度
pub const DEFAULT_DURATION: &str = "24h";

/// 配置文件内容
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_format: Option<String>,
    pub date_format: Option<String>,
    pub duration: Option<String>,
    pub wait_min: Option<u64>,
    pub wait_max: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/ics-notify/config.json"))
    }

    /// 加载默认位置的配置；文件不存在或无法解析时使用默认值
    pub fn load_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(&path) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }

    /// 加载指定配置文件，任何错误都返回给调用方
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }
}

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").expect("valid duration regex")
});

/// 解析窗口时长：`90`（秒）、`45s`、`15m`、`1h30m`
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Config("empty duration".to_string()));
    }
    if let Ok(seconds) = value.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let caps = DURATION_PATTERN
        .captures(value)
        .ok_or_else(|| Error::Config(format!("invalid duration {:?}, expected e.g. 24h, 1h30m, 90s", value)))?;

    let out_of_range = || Error::Config(format!("duration {:?} out of range", value));
    let field = |idx: usize| -> Result<u64> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse::<u64>().map_err(|_| out_of_range()),
            None => Ok(0),
        }
    };

    let mut seconds: u64 = 0;
    for (idx, unit) in [(1, 3_600), (2, 60), (3, 1)] {
        seconds = field(idx)?
            .checked_mul(unit)
            .and_then(|part| seconds.checked_add(part))
            .ok_or_else(out_of_range)?;
    }
    Ok(Duration::from_secs(seconds))
}
