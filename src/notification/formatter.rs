//! 通知格式化 - 用用户模板渲染边界通知
//!
//! 模板引擎为 minijinja，变量即 [`NotificationView`] 的字段，另外提供：
//! - `sanitize(text)` / `| sanitize`：HTML 转安全纯文本
//! - `matches(pattern, text)`：正则判断，用于在模板里按标题过滤
//! - `| urlquery`：查询串转义（空格转 `+`）
//!
//! 模板只编译一次；编译失败属于配置错误。

use std::fmt::Write as _;
use std::io::Write;

use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value};
use regex::Regex;
use tracing::debug;

use super::event::{Notification, NotificationView};
use super::sanitizer::to_plain_text;
use crate::error::{Error, Result};

const TEMPLATE_NAME: &str = "format";

/// 批量输出的默认模板：每行一条，字段用空格分隔，文本字段做查询串转义
pub const BATCH_FORMAT: &str = "{{ epoch }} {{ offset }} {{ kind }} {{ summary | urlquery }} \
{{ description | urlquery if description else \"-\" }} \
{{ location | urlquery if location else \"-\" }}\n";

/// 等待模式的默认模板：给人看的消息
pub const MESSAGE_FORMAT: &str = "{{ date }}: {{ kind }}: {{ summary }}
{%- if location %}
Location: {{ location }}
{%- endif %}
{%- if description %}
Description: {{ description }}
{%- endif %}
";

/// 模板渲染器
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    /// 编译模板
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);

        env.add_filter("sanitize", sanitize);
        env.add_function("sanitize", sanitize);
        env.add_filter("urlquery", urlquery);
        env.add_function("matches", matches);

        env.add_template_owned(TEMPLATE_NAME, source.into())
            .map_err(Error::TemplateCompile)?;

        Ok(Self { env })
    }

    /// 渲染单条通知并立即 flush
    pub fn render_one<W: Write + ?Sized>(&self, notification: &Notification, out: &mut W) -> Result<()> {
        let template = self
            .env
            .get_template(TEMPLATE_NAME)
            .map_err(Error::Render)?;
        template
            .render_to_write(notification.view(), &mut *out)
            .map_err(Error::Render)?;
        out.flush()?;
        Ok(())
    }

    /// 依次渲染一组通知，遇到第一个错误即中止，之前的输出已经 flush
    pub fn render<W: Write + ?Sized>(&self, notifications: &[Notification], out: &mut W) -> Result<()> {
        for notification in notifications {
            debug!(epoch = notification.epoch, kind = %notification.kind, "Rendering notification");
            self.render_one(notification, out)?;
        }
        Ok(())
    }
}

fn sanitize(text: &str) -> String {
    to_plain_text(text)
}

/// 正则不合法时直接报错，不当作不匹配
fn matches(pattern: &str, text: &str) -> std::result::Result<bool, minijinja::Error> {
    let re = Regex::new(pattern).map_err(|e| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("matches: invalid pattern {:?}: {}", pattern, e),
        )
    })?;
    Ok(re.is_match(text))
}

fn urlquery(value: Value) -> String {
    query_escape(&value.to_string())
}

/// 查询串转义：字母数字和 `-_.~` 保留，空格转 `+`，其余 `%XX`
pub fn query_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            b' ' => out.push('+'),
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}
