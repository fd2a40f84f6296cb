//! 日历事件与时间窗口

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// 解析器产出的原始事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawEvent {
    /// UID（可选）
    pub uid: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl RawEvent {
    /// 创建只有时间和标题的事件
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, summary: impl Into<String>) -> Self {
        Self {
            uid: None,
            start,
            end,
            summary: summary.into(),
            description: None,
            location: None,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// 关注的时间窗口，`end` 必须晚于 `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(Error::Config(format!(
                "window end {} must be after window start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// 从 `start` 开始、长度为 `duration` 的窗口
    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> Result<Self> {
        let end = start.checked_add_signed(duration).ok_or_else(|| {
            Error::Config(format!("window of {} from {} is out of range", duration, start))
        })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// 窗口起点（秒，向下取整）
    pub fn start_epoch(&self) -> i64 {
        self.start.timestamp()
    }

    /// 事件是否与窗口有交集（端点相接也算）
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        end >= self.start && start <= self.end
    }
}
