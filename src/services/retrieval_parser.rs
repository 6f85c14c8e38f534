//! 检索片段解析器（尽力而为）
//!
//! 知识库片段是半结构化文本，形如：
//!
//! ```text
//! "题目图片地址":"`https://...`";"答案图片地址":"https://...";"题目文本":"...";"答案文本":"..."
//! ```
//!
//! 任何字段缺失或格式不符都只会得到空字符串，不会报错。
//! 片段格式确定后可以整体替换为严格的结构化解析，调用方只依赖 [`parse`]。

use regex::Regex;

const QUESTION_IMAGE_KEY: &str = "题目图片地址";
const ANSWER_IMAGE_KEY: &str = "答案图片地址";
const QUESTION_TEXT_KEY: &str = "题目文本";
const ANSWER_TEXT_KEY: &str = "答案文本";

/// 字段分隔符 `";"`
const FIELD_TERMINATOR: &str = "\";\"";

/// 从片段中解析出的字段，缺失的为空字符串
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialFields {
    pub question_image_url: String,
    pub answer_image_url: String,
    pub question_text: String,
    pub answer_text: String,
}

/// 解析片段内容
pub fn parse(content: &str) -> PartialFields {
    PartialFields {
        question_image_url: extract_url(content, QUESTION_IMAGE_KEY),
        answer_image_url: extract_url(content, ANSWER_IMAGE_KEY),
        question_text: extract_question_text(content),
        answer_text: extract_answer_text(content),
    }
}

/// `"key":"value"`，value 不含引号；去掉 markdown 反引号
fn extract_url(content: &str, key: &str) -> String {
    let pattern = format!(r#""{}":"([^"]+)""#, regex::escape(key));
    let Ok(re) = Regex::new(&pattern) else {
        return String::new();
    };

    re.captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_matches('`').trim().to_string())
        .unwrap_or_default()
}

/// 取 `"key":"` 之后的剩余部分
fn after_anchor<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    let anchor = format!("\"{}\":\"", key);
    content
        .find(&anchor)
        .map(|start| &content[start + anchor.len()..])
}

/// 题目文本：必须以 `";"` 结束，且不能以引号开头
fn extract_question_text(content: &str) -> String {
    after_anchor(content, QUESTION_TEXT_KEY)
        .filter(|rest| !rest.starts_with('"'))
        .and_then(|rest| rest.find(FIELD_TERMINATOR).map(|end| &rest[..end]))
        .map(unescape_newlines)
        .unwrap_or_default()
}

/// 答案文本：以 `";"` 结束，或者是片段的最后一个字段（以 `"` 结尾）
fn extract_answer_text(content: &str) -> String {
    let Some(rest) = after_anchor(content, ANSWER_TEXT_KEY) else {
        return String::new();
    };

    if let Some(end) = rest.find(FIELD_TERMINATOR) {
        return unescape_newlines(&rest[..end]);
    }

    rest.strip_suffix('"')
        .map(unescape_newlines)
        .unwrap_or_default()
}

/// 把字面量 `\n` 还原为换行
fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}
