//! 日历模型与解析

pub mod event;
pub mod parser;
pub mod recurrence;

pub use event::{RawEvent, Window};
pub use parser::{CalendarParser, IcalCalendarParser};
pub use recurrence::Recurrence;
