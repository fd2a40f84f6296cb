//! 日历来源 - HTTP(S)、本地文件或 stdin

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};

/// HTTP 请求默认超时（秒）
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// 日历来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarSource {
    Http(String),
    File(String),
    Stdin,
}

impl CalendarSource {
    /// 根据参数识别来源：`http(s)://` 走网络，`-` 或空为 stdin，其余按文件路径处理
    pub fn parse(source: Option<&str>) -> Self {
        match source.map(str::trim) {
            None | Some("") | Some("-") => CalendarSource::Stdin,
            Some(s) if s.starts_with("http://") || s.starts_with("https://") => {
                CalendarSource::Http(s.to_string())
            }
            Some(s) => CalendarSource::File(s.strip_prefix("file://").unwrap_or(s).to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CalendarSource::Http(url) => url,
            CalendarSource::File(path) => path,
            CalendarSource::Stdin => "<stdin>",
        }
    }
}

/// 打开日历字节流
pub fn fetch_calendar(source: &CalendarSource, timeout: Duration) -> Result<Box<dyn BufRead>> {
    match source {
        CalendarSource::Http(url) => {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| Error::fetch(url.as_str(), e))?;

            let start = Instant::now();
            let response = client
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| Error::fetch(url.as_str(), e))?;
            debug!(url = %url, status = %response.status(), elapsed_ms = start.elapsed().as_millis(), "Calendar fetched");

            Ok(Box::new(BufReader::new(response)))
        }
        CalendarSource::File(path) => {
            let file = File::open(path).map_err(|e| Error::fetch(path.as_str(), e))?;
            debug!(path = %path, "Reading calendar file");
            Ok(Box::new(BufReader::new(file)))
        }
        CalendarSource::Stdin => {
            debug!("Reading calendar from stdin");
            Ok(Box::new(BufReader::new(io::stdin())))
        }
    }
}
