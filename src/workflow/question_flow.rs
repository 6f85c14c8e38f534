//! 题目处理流程 - 流程层
//!
//! 核心职责：定义"一道题"的完整处理流程
//!
//! 流程顺序：
//! 1. 知识库检索（失败不影响后续，只是没有参考图片）
//! 2. 上传题目裁剪图片
//! 3. AI 批改 → 解析结论
//!
//! 流程本身从不返回错误：任何一步失败都会变成 `success = false` 的批改记录。

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::clients::ImageStore;
use crate::error::AppResult;
use crate::models::grading::{GradingOutcome, GradingRecord, RetrievalMatch};
use crate::models::question::Question;
use crate::services::{GradingService, RetrievalService};
use crate::utils::logging::truncate_text;
use crate::workflow::question_ctx::QuestionCtx;

/// 题目处理流程
///
/// - 编排单题的 检索 → 上传 → 批改
/// - 不持有任何 HTTP 资源，只依赖业务能力（services）和注入的存储
pub struct QuestionFlow {
    retrieval: RetrievalService,
    grading: GradingService,
    store: Arc<dyn ImageStore>,
}

impl QuestionFlow {
    pub fn new(retrieval: RetrievalService, grading: GradingService, store: Arc<dyn ImageStore>) -> Self {
        Self {
            retrieval,
            grading,
            store,
        }
    }

    pub async fn run(&self, question: &Question, ctx: &QuestionCtx) -> GradingRecord {
        let started = Instant::now();
        info!(
            "{} 开始处理，文本: {}",
            ctx,
            truncate_text(&question.text, 50)
        );

        // ========== 步骤 1: 知识库检索 ==========
        let reference = self.retrieve(question, ctx).await;

        // ========== 步骤 2: 上传裁剪图片 ==========
        let image_url = match self.upload(question).await {
            Ok(url) => url,
            Err(e) => {
                error!("{} ❌ 图片上传失败: {}", ctx, e);
                return build_record(
                    question,
                    reference.as_ref(),
                    GradingOutcome::failed(format!("图片上传失败: {}", e)),
                    question.image_name.clone(),
                );
            }
        };

        // ========== 步骤 3: AI 批改 ==========
        let outcome = match self.grading.grade(&image_url, question, reference.as_ref()).await {
            Ok(outcome) => {
                info!(
                    "{} ✓ 批改完成，得分: {:?}，正确: {:?}",
                    ctx, outcome.score, outcome.correct
                );
                outcome
            }
            Err(e) => {
                error!("{} ❌ 批改失败: {}", ctx, e);
                GradingOutcome::failed(e.to_string())
            }
        };

        info!(
            "{} 总处理时间: {:.2}秒",
            ctx,
            started.elapsed().as_secs_f64()
        );
        build_record(question, reference.as_ref(), outcome, image_url)
    }

    async fn retrieve(&self, question: &Question, ctx: &QuestionCtx) -> Option<RetrievalMatch> {
        match self.retrieval.search(&question.text).await {
            Ok(matched) => {
                info!("{} ✓ 检索完成，相似度: {:.3}", ctx, matched.similarity_score);
                Some(matched)
            }
            Err(e) => {
                warn!("{} ⚠️ 检索失败，不附带参考信息: {}", ctx, e);
                None
            }
        }
    }

    async fn upload(&self, question: &Question) -> AppResult<String> {
        let bytes = question.to_jpeg()?;
        self.store.upload(&question.image_name, bytes).await
    }
}

/// 组装单题结果；没有检索结果时参考文本为空、相似度为 0
pub fn build_record(
    question: &Question,
    reference: Option<&RetrievalMatch>,
    grading: GradingOutcome,
    image_ref: String,
) -> GradingRecord {
    GradingRecord {
        question_id: question.question_id,
        region: question.region.clone(),
        text: question.text.clone(),
        reference_text: reference.map(|r| r.reference_text.clone()).unwrap_or_default(),
        similarity_score: reference.map(|r| r.similarity_score).unwrap_or(0.0),
        grading,
        image_ref,
    }
}
