//! 错误类型
//!
//! 库内部统一返回 [`Result`]，二进制入口再用 `anyhow` 包一层。

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// ics-notify 的错误
#[derive(Error, Debug)]
pub enum Error {
    /// 获取日历失败（网络或文件 I/O）
    #[error("failed to fetch calendar from {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// 日历内容无法解析
    #[error("failed to parse calendar: {0}")]
    Parse(String),

    /// 用户模板编译失败
    #[error("invalid output template: {0}")]
    TemplateCompile(#[source] minijinja::Error),

    /// 模板渲染失败（包括 matches 中的非法正则）
    #[error("failed to render notification: {0}")]
    Render(#[source] minijinja::Error),

    /// 配置错误
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn fetch(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}
