//! 重复事件展开 - RRULE 按窗口展开为各次实例
//!
//! 规则计算交给 `rrule` crate；EXDATE 在这里按实例开始时间扣除。

use chrono::{DateTime, Duration, Utc};
use rrule::{RRuleSet, Tz};
use tracing::{debug, warn};

use super::event::{RawEvent, Window};

/// 单个事件在一个窗口内最多展开的实例数
pub const MAX_INSTANCES: u16 = 1000;

/// 一个 VEVENT 的重复规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    /// `DTSTART…` 与 `RRULE:…` 两行，rrule 的输入格式
    source: String,
    exdates: Vec<DateTime<Utc>>,
}

impl Recurrence {
    pub fn new(dtstart: String, rrule: &str, exdates: Vec<DateTime<Utc>>) -> Self {
        Self {
            source: format!("{}\nRRULE:{}", dtstart, rrule),
            exdates,
        }
    }

    /// 展开 `event` 在窗口附近的实例，每个实例保持原事件的时长
    ///
    /// 规则无法解析时记录警告，只保留第一次。
    pub fn expand(&self, event: &RawEvent, window: &Window) -> Vec<RawEvent> {
        let set = match self.source.parse::<RRuleSet>() {
            Ok(set) => set,
            Err(e) => {
                warn!(summary = %event.summary, error = %e, "Unsupported RRULE, keeping first instance");
                return vec![event.clone()];
            }
        };

        let length = event.end - event.start;
        // 窗口开始前就已开始、但仍在进行中的实例也要算上；两端各放宽一秒
        let after = window
            .start()
            .checked_sub_signed(length)
            .and_then(|t| t.checked_sub_signed(Duration::seconds(1)))
            .unwrap_or(window.start());
        let before = window
            .end()
            .checked_add_signed(Duration::seconds(1))
            .unwrap_or(window.end());

        let result = set
            .after(after.with_timezone(&Tz::UTC))
            .before(before.with_timezone(&Tz::UTC))
            .all(MAX_INSTANCES);
        if result.limited {
            warn!(summary = %event.summary, limit = MAX_INSTANCES, "Too many recurrences in window, truncated");
        }

        let instances: Vec<RawEvent> = result
            .dates
            .into_iter()
            .map(|date| date.with_timezone(&Utc))
            .filter(|start| !self.exdates.contains(start))
            .filter_map(|start| {
                let end = start.checked_add_signed(length)?;
                Some(RawEvent {
                    start,
                    end,
                    ..event.clone()
                })
            })
            .collect();

        debug!(summary = %event.summary, count = instances.len(), "Expanded recurring event");
        instances
    }
}
