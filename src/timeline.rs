//! 事件边界时间线
//!
//! 把日历事件展开为开始/结束两类边界通知，按秒聚合并升序排列：
//! - 开始边界只在事件开始时间不早于窗口起点时记录（纳秒精度比较）
//! - 结束边界总是记录，即使落在窗口之外（进行中的事件也要报告结束）
//! - 同一秒内的通知保持输入顺序

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use tracing::debug;

use crate::calendar::{RawEvent, Window};
use crate::error::{Error, Result};
use crate::notification::{BoundaryKind, Notification};

/// 默认日期格式，例如 `Mon Jan  2 15:04:05 +08:00 2006`
pub const DEFAULT_DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Z %Y";

/// 按时间排序的通知分组，构建后只读
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    groups: BTreeMap<i64, Vec<Notification>>,
}

impl Timeline {
    /// 升序的边界时间
    pub fn keys(&self) -> Vec<i64> {
        self.groups.keys().copied().collect()
    }

    pub fn group(&self, epoch: i64) -> Option<&[Notification]> {
        self.groups.get(&epoch).map(Vec::as_slice)
    }

    /// 按时间顺序遍历 (epoch, 通知组)
    pub fn groups(&self) -> impl Iterator<Item = (i64, &[Notification])> {
        self.groups.iter().map(|(epoch, group)| (*epoch, group.as_slice()))
    }

    /// 最早的一组通知
    pub fn first_group(&self) -> Option<&[Notification]> {
        self.groups.values().next().map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// 不同边界时间的数量
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn notification_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    fn push(&mut self, notification: Notification) {
        self.groups.entry(notification.epoch).or_default().push(notification);
    }
}

/// 时间线构建器
#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    window: Window,
    date_format: String,
}

impl TimelineBuilder {
    pub fn new(window: Window) -> Self {
        Self {
            window,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// 设置日期格式（strftime 语法）
    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// 构建时间线
    pub fn build<I>(&self, events: I) -> Timeline
    where
        I: IntoIterator<Item = RawEvent>,
    {
        let mut timeline = Timeline::default();
        let window_start = self.window.start_epoch();

        for mut event in events {
            event.description = event.description.as_deref().map(unescape_newlines);

            let start = event.start.timestamp();
            let end = event.end.timestamp();

            if event.start >= self.window.start() {
                timeline.push(Notification {
                    epoch: start,
                    offset: start - window_start,
                    date: self.format_date(event.start),
                    kind: BoundaryKind::Start,
                    event: event.clone(),
                });
            } else {
                debug!(summary = %event.summary, "Event started before window, start boundary skipped");
            }

            let date = self.format_date(event.end);
            timeline.push(Notification {
                epoch: end,
                offset: end - window_start,
                date,
                kind: BoundaryKind::End,
                event,
            });
        }

        debug!(
            boundaries = timeline.len(),
            notifications = timeline.notification_count(),
            "Timeline built"
        );
        timeline
    }

    fn format_date(&self, instant: DateTime<Utc>) -> String {
        let mut date = String::new();
        let local = instant.with_timezone(&Local);
        if write!(date, "{}", local.format(&self.date_format)).is_err() {
            return local.to_rfc3339();
        }
        date
    }
}

/// 把 `\N` 和 `\n` 转义序列还原为换行
pub fn unescape_newlines(text: &str) -> String {
    text.replace("\\N", "\n").replace("\\n", "\n")
}

/// 检查日期格式是否合法
pub fn validate_date_format(date_format: &str) -> Result<()> {
    if StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::Config(format!("invalid date format {:?}", date_format)));
    }
    Ok(())
}
