//! 检索服务 - 业务能力层
//!
//! 只负责"根据题目文本找到最相似的原题"，不关心流程。

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::clients::KnowledgeBase;
use crate::error::{AppResult, InputError};
use crate::models::grading::RetrievalMatch;
use crate::services::retrieval_parser;
use crate::utils::logging::truncate_text;

/// 检索服务
///
/// - 空查询直接返回错误，不调用知识库
/// - 超长查询按字符截断
/// - 取第一条记录作为最佳匹配
pub struct RetrievalService {
    knowledge: Arc<dyn KnowledgeBase>,
    query_max_chars: usize,
}

impl RetrievalService {
    pub fn new(knowledge: Arc<dyn KnowledgeBase>, query_max_chars: usize) -> Self {
        Self {
            knowledge,
            query_max_chars,
        }
    }

    /// 检索与题目文本最相似的原题
    pub async fn search(&self, query: &str) -> AppResult<RetrievalMatch> {
        let query = query.trim();
        if query.is_empty() {
            return Err(InputError::EmptyQuery.into());
        }

        let char_count = query.chars().count();
        let query: String = if char_count > self.query_max_chars {
            warn!(
                "⚠️ 查询文本超过 {} 字符限制（当前 {}），已截断",
                self.query_max_chars, char_count
            );
            query.chars().take(self.query_max_chars).collect()
        } else {
            query.to_string()
        };

        let raw = self.knowledge.retrieve(&query).await?;
        let matched = normalize(&raw);

        info!(
            "✓ 检索完成，共 {} 条记录，最佳相似度: {:.3}",
            matched.record_count, matched.similarity_score
        );
        Ok(matched)
    }
}

/// 把知识库原始响应整理为 [`RetrievalMatch`]
///
/// `records` 为空或缺失时返回相似度 0.0、字段全空的结果。
pub fn normalize(raw: &Value) -> RetrievalMatch {
    let records = raw
        .get("records")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let Some(best) = records.first() else {
        warn!("⚠️ 知识库返回空结果");
        return RetrievalMatch::default();
    };

    let content = best
        .pointer("/segment/content")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let fields = retrieval_parser::parse(content);

    let source_document = best
        .get("source")
        .and_then(Value::as_str)
        .or_else(|| best.pointer("/segment/document/name").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let matched = RetrievalMatch {
        similarity_score: best
            .get("score")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0),
        reference_text: content.to_string(),
        question_image_url: fields.question_image_url,
        answer_image_url: fields.answer_image_url,
        question_text: fields.question_text,
        answer_text: fields.answer_text,
        source_document,
        record_count: records.len(),
    };

    info!(
        "题目文本: {} | 题目图片: {} | 答案图片: {}",
        truncate_text(&matched.question_text, 30),
        matched.question_image_url,
        matched.answer_image_url
    );
    matched
}
