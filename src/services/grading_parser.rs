//! 批改结果解析器
//!
//! 批改服务的响应是 `{data: {outputs: {result, text, score, correct}}}`，
//! 其中 `result` 是再次编码的 JSON 字符串：`[{"isRight": true, "answerAreaPosition": ...}]`。
//! 任何一层解析失败都退回默认值（0 分、不正确），不报错。

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// 解析出的批改结论
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verdict {
    pub score: u8,
    pub correct: bool,
    pub feedback: Option<String>,
    pub answer_area_position: Option<Value>,
}

/// 分数匹配模式，按优先级排列
const SCORE_PATTERNS: [&str; 4] = [
    r"得分[:：]\s*(\d+)",
    r"分数[:：]\s*(\d+)",
    r"评分[:：]\s*(\d+)",
    r"(\d+)\s*分",
];

const NEGATIVE_KEYWORDS: [&str; 4] = ["不正确", "不对", "错误", "错"];
const POSITIVE_KEYWORDS: [&str; 2] = ["正确", "对"];

/// 解析批改服务原始响应
pub fn parse(raw: &Value) -> Verdict {
    let mut verdict = Verdict::default();

    let Some(outputs) = raw.pointer("/data/outputs") else {
        warn!("⚠️ 批改结果中未找到 data.outputs");
        return verdict;
    };

    let structured = outputs.get("result").and_then(parse_result_field);
    if let Some(first) = &structured {
        if let Some(is_right) = first.get("isRight") {
            verdict.correct = truthy(is_right);
            verdict.score = if verdict.correct { 100 } else { 0 };
        }
        verdict.answer_area_position = first.get("answerAreaPosition").cloned();
    }

    if let Some(text) = outputs.get("text").and_then(Value::as_str) {
        verdict.feedback = Some(text.to_string());

        let has_verdict = structured.as_ref().is_some_and(|f| f.get("isRight").is_some());
        if !has_verdict {
            if let Some(score) = score_from_text(text) {
                verdict.score = score;
            }
            if let Some(correct) = correctness_from_text(text) {
                verdict.correct = correct;
            }
        }
    }

    if let Some(score) = outputs.get("score").and_then(number_like) {
        verdict.score = clamp_score(score);
    }
    if let Some(correct) = outputs.get("correct") {
        verdict.correct = truthy(correct);
    }

    debug!("批改结论: 得分 {}，正确性 {}", verdict.score, verdict.correct);
    verdict
}

/// `result` 可能是 JSON 字符串，也可能已经是数组；取第一个元素
fn parse_result_field(result: &Value) -> Option<Value> {
    let parsed = match result {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(v) => v,
            Err(e) => {
                warn!("⚠️ 解析 result JSON 失败: {}", e);
                return None;
            }
        },
        other => other.clone(),
    };

    match parsed {
        Value::Array(items) => items.into_iter().next(),
        object @ Value::Object(_) => Some(object),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(s.trim(), "true" | "True" | "1" | "正确" | "对"),
        _ => false,
    }
}

fn number_like(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn clamp_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.round().clamp(0.0, 100.0) as u8
}

/// 从反馈文本中提取分数，如 `得分: 85/100`、`分数：90`、`85分`
pub fn score_from_text(text: &str) -> Option<u8> {
    SCORE_PATTERNS.iter().find_map(|pattern| {
        let re = Regex::new(pattern).ok()?;
        let caps = re.captures(text)?;
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        Some(clamp_score(value))
    })
}

/// 从反馈文本判断正误，否定词优先（"不正确" 包含 "正确"）
pub fn correctness_from_text(text: &str) -> Option<bool> {
    if NEGATIVE_KEYWORDS.iter().any(|k| text.contains(k)) {
        Some(false)
    } else if POSITIVE_KEYWORDS.iter().any(|k| text.contains(k)) {
        Some(true)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_verdict() {
        let raw = json!({
            "data": {"outputs": {
                "result": "[{\"isRight\": true, \"answerAreaPosition\": [10, 20, 30, 40]}]",
                "text": "回答错误的地方已标出"
            }}
        });

        let verdict = parse(&raw);
        assert!(verdict.correct);
        assert_eq!(verdict.score, 100);
        assert_eq!(verdict.answer_area_position, Some(json!([10, 20, 30, 40])));
        // 有结构化结论时不再从文本推断
        assert_eq!(verdict.feedback.as_deref(), Some("回答错误的地方已标出"));
    }

    #[test]
    fn test_wrong_answer() {
        let raw = json!({"data": {"outputs": {"result": "[{\"isRight\": false}]"}}});
        let verdict = parse(&raw);
        assert!(!verdict.correct);
        assert_eq!(verdict.score, 0);
    }

    #[test]
    fn test_malformed_levels_degrade_to_default() {
        assert_eq!(parse(&json!({})), Verdict::default());
        assert_eq!(parse(&json!({"data": {"outputs": {"result": "{not json"}}})), Verdict::default());
        assert_eq!(parse(&json!({"data": {"outputs": {"result": "[]"}}})), Verdict::default());
        assert_eq!(parse(&json!("plain string")), Verdict::default());
    }

    #[test]
    fn test_textual_fallback() {
        let raw = json!({"data": {"outputs": {"text": "得分：85/100，解题思路正确"}}});
        let verdict = parse(&raw);
        assert_eq!(verdict.score, 85);
        assert!(verdict.correct);

        assert_eq!(correctness_from_text("答案不正确"), Some(false));
        assert_eq!(correctness_from_text("看不出来"), None);
        assert_eq!(score_from_text("本题 120 分"), Some(100));
        assert_eq!(score_from_text("没有分数信息"), None);
    }

    #[test]
    fn test_outputs_override() {
        let raw = json!({"data": {"outputs": {
            "result": "[{\"isRight\": true}]",
            "score": "60",
            "correct": false
        }}});
        let verdict = parse(&raw);
        assert_eq!(verdict.score, 60);
        assert!(!verdict.correct);
    }
}
