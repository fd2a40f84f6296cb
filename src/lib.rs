//! ics-notify - 把日历事件转换为开始/结束通知

pub mod calendar;
pub mod cli;
pub mod config;
pub mod error;
pub mod infra;
pub mod notification;
pub mod scheduler;
pub mod timeline;

pub use calendar::{CalendarParser, IcalCalendarParser, RawEvent, Window};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use infra::{fetch_calendar, CalendarSource};
pub use notification::{to_plain_text, BoundaryKind, Notification, Renderer, BATCH_FORMAT, MESSAGE_FORMAT};
pub use scheduler::{decide, DryRunSleeper, Scheduler, Sleeper, ThreadSleeper, WaitDecision};
pub use timeline::{Timeline, TimelineBuilder, DEFAULT_DATE_FORMAT};
