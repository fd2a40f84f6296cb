//! 描述文本清理 - 把日历里的 HTML 片段转换成安全的纯文本
//!
//! 日历内容来自外部，不可信，这里是它进入模板之前唯一的处理点。
//!
//! 处理顺序：
//! 1. 常见标签转换为纯文本记号（粗体、换行、斜体、代码块、列表）
//! 2. 严格清理：只保留文本节点，丢弃所有标签、属性和脚本内容
//! 3. 解码 HTML 实体

use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use scraper::{Html, Node};

/// 标签替换规则，按顺序执行
pub static MARKUP_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // 粗体
        (r"(?i)</?b>", "*"),
        // 换行
        (r"(?i)<br\s*/?>", "\n"),
        // 斜体
        (r"(?i)</?i>", "_"),
        // 预格式化块
        (r"(?i)</?pre>", "\n```\n"),
        // 列表容器
        (r"(?i)</?(?:dl|ol|ul)>", "\n\n"),
        // 列表项
        (r"(?i)<li>", "* "),
        (r"(?i)</li>", "\n"),
    ]
    .iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid markup rule"), *replacement))
    .collect()
});

/// 这些元素的内容整体丢弃
const SKIP_CONTENT_ELEMENTS: &[&str] = &[
    "frame", "frameset", "iframe", "noembed", "noframes", "noscript", "nostyle", "object",
    "script", "style", "title",
];

/// 把 HTML 片段转换为纯文本
pub fn to_plain_text(raw: &str) -> String {
    let marked = apply_markup_rules(raw);
    let stripped = strict_sanitize(&marked);
    decode_entities(&stripped)
}

/// 第一步：标签转纯文本记号
fn apply_markup_rules(raw: &str) -> String {
    let mut result = raw.to_string();
    for (re, replacement) in MARKUP_RULES.iter() {
        result = re.replace_all(&result, NoExpand(replacement)).into_owned();
    }
    result
}

/// 第二步：严格清理，输出只含转义文本
pub fn strict_sanitize(input: &str) -> String {
    let fragment = Html::parse_fragment(input);
    let mut out = String::with_capacity(input.len());

    for node in fragment.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIP_CONTENT_ELEMENTS.contains(&el.name()))
        });
        if !skipped {
            escape_into(&mut out, text);
        }
    }

    out
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// 第三步：解码实体
///
/// 输入来自 `strict_sanitize`，不含任何标签，HTML 解析器只负责实体解码。
fn decode_entities(escaped: &str) -> String {
    if !escaped.contains('&') {
        return escaped.to_string();
    }
    let fragment = Html::parse_fragment(escaped);
    fragment
        .tree
        .root()
        .descendants()
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect()
}
