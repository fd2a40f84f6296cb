//! 基础设施层 - 日历来源

pub mod fetch;

pub use fetch::{fetch_calendar, CalendarSource, DEFAULT_FETCH_TIMEOUT_SECS};
