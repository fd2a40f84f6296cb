//! 通知层 - 边界通知的数据结构、文本清理和模板渲染
//!
//! # 使用示例
//! ```ignore
//! use ics_notify::notification::{Renderer, BATCH_FORMAT};
//!
//! let renderer = Renderer::new(BATCH_FORMAT)?;
//! renderer.render(&notifications, &mut std::io::stdout().lock())?;
//! ```

pub mod event;
pub mod formatter;
pub mod sanitizer;

pub use event::{BoundaryKind, Notification, NotificationView};
pub use formatter::{query_escape, Renderer, BATCH_FORMAT, MESSAGE_FORMAT};
pub use sanitizer::to_plain_text;
