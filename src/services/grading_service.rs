//! 批改服务 - 业务能力层
//!
//! 只负责"批改一道题"：组装请求 → 调用批改服务 → 解析结论。

use std::sync::Arc;

use tracing::info;

use crate::clients::{GradingEngine, GradingRequest};
use crate::error::AppResult;
use crate::models::grading::{GradingOutcome, RetrievalMatch};
use crate::models::question::Question;
use crate::services::grading_parser;

pub struct GradingService {
    engine: Arc<dyn GradingEngine>,
}

impl GradingService {
    pub fn new(engine: Arc<dyn GradingEngine>) -> Self {
        Self { engine }
    }

    /// 组装批改请求
    ///
    /// 没有检索结果时不附带参考图片。
    pub fn build_request(
        image_url: &str,
        question: &Question,
        reference: Option<&RetrievalMatch>,
    ) -> AppResult<GradingRequest> {
        Ok(GradingRequest {
            image_url: image_url.to_string(),
            user_question_ocr: question.char_payload()?,
            reference_image_urls: reference
                .map(RetrievalMatch::reference_image_urls)
                .unwrap_or_default(),
        })
    }

    /// 批改一道题
    pub async fn grade(
        &self,
        image_url: &str,
        question: &Question,
        reference: Option<&RetrievalMatch>,
    ) -> AppResult<GradingOutcome> {
        let request = Self::build_request(image_url, question, reference)?;
        info!(
            "[题目 {}] 发送批改请求，字符坐标 {} 个，参考图片 {} 张",
            question.question_id,
            question.characters.len(),
            request.reference_image_urls.len()
        );

        let raw = self.engine.run(&request).await?;
        let verdict = grading_parser::parse(&raw);

        Ok(GradingOutcome {
            success: true,
            score: Some(verdict.score),
            correct: Some(verdict.correct),
            feedback: verdict.feedback,
            error: None,
            answer_area_position: verdict.answer_area_position,
        })
    }
}
