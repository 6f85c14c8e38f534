//! 检索与批改结果模型

use crate::models::region::BoundingBox;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 知识库检索的最佳匹配
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    /// 相似度，0.0 ~ 1.0；无结果时为 0.0
    pub similarity_score: f64,
    /// 最佳匹配的完整片段内容
    pub reference_text: String,
    pub question_image_url: String,
    pub answer_image_url: String,
    pub question_text: String,
    pub answer_text: String,
    pub source_document: String,
    /// 检索返回的记录条数
    pub record_count: usize,
}

impl RetrievalMatch {
    /// 非空的参考图片地址（题目图在前，答案图在后）
    pub fn reference_image_urls(&self) -> Vec<String> {
        [&self.question_image_url, &self.answer_image_url]
            .into_iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// 单题批改结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradingOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 作答区域坐标，原样透传
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_area_position: Option<Value>,
}

impl GradingOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// 单题最终输出，位于结果数组的 `question_id - 1` 处
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingRecord {
    pub question_id: usize,
    pub region: BoundingBox,
    pub text: String,
    pub reference_text: String,
    pub similarity_score: f64,
    pub grading: GradingOutcome,
    /// 题目图片地址（上传失败时为本地文件名）
    pub image_ref: String,
}

/// 各阶段耗时（秒）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub segmentation_secs: f64,
    pub ocr_secs: f64,
    pub split_secs: f64,
    pub grading_secs: f64,
}

/// 整页处理结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub success: bool,
    pub total_questions: usize,
    pub successful_grading: usize,
    pub results: Vec<GradingRecord>,
    pub processing_time_secs: f64,
    pub stage_timings: StageTimings,
    /// OCR 全文（markdown 优先）
    pub ocr_text: String,
}
