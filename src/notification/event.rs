//! 边界通知结构
//!
//! 一个日历事件最多产生两条通知：开始和结束。

use serde::Serialize;

use crate::calendar::RawEvent;

/// 边界类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Start,
    End,
}

impl BoundaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryKind::Start => "start",
            BoundaryKind::End => "end",
        }
    }
}

impl std::fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单条边界通知，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// 边界时间（秒）
    pub epoch: i64,
    /// 相对窗口起点的秒数，已开始事件的结束边界可能为负
    pub offset: i64,
    /// 按 date format 格式化后的本地时间
    pub date: String,
    pub kind: BoundaryKind,
    pub event: RawEvent,
}

/// 模板可见的字段
#[derive(Debug, Serialize)]
pub struct NotificationView<'a> {
    pub epoch: i64,
    pub offset: i64,
    pub kind: BoundaryKind,
    pub date: &'a str,
    pub summary: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub uid: &'a str,
    pub event_start: i64,
    pub event_end: i64,
}

impl Notification {
    /// 转换为模板上下文，缺失的文本字段渲染为空字符串
    pub fn view(&self) -> NotificationView<'_> {
        NotificationView {
            epoch: self.epoch,
            offset: self.offset,
            kind: self.kind,
            date: &self.date,
            summary: &self.event.summary,
            description: self.event.description.as_deref().unwrap_or(""),
            location: self.event.location.as_deref().unwrap_or(""),
            uid: self.event.uid.as_deref().unwrap_or(""),
            event_start: self.event.start.timestamp(),
            event_end: self.event.end.timestamp(),
        }
    }
}
