//! 整页处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **读取页面**：页面缺失或无法读取时立即返回输入错误
//! 2. **题目分割**：调用检测服务，得到有序的题目区域
//! 3. **OCR 识别**：得到文本块与字符坐标
//! 4. **区域提取 + 裁剪**：纯计算，在并发之前同步完成
//! 5. **并发批改**：委托 `PageGrader`
//! 6. **统计输出**：各阶段耗时、成功数量

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use crate::clients::{
    DetectionClient, Detector, GradingClient, GradingEngine, ImageStore, KnowledgeBase,
    KnowledgeClient, OcrClient, OcrEngine, StorageClient,
};
use crate::config::Config;
use crate::error::{AppResult, InputError};
use crate::extraction::{build_regions, extract_regions, QuestionSplitter};
use crate::models::grading::{PageReport, StageTimings};
use crate::orchestrator::page_grader::PageGrader;
use crate::services::{GradingService, RetrievalService};
use crate::workflow::QuestionFlow;

/// 流水线依赖的全部外部服务
#[derive(Clone)]
pub struct Collaborators {
    pub detector: Arc<dyn Detector>,
    pub ocr: Arc<dyn OcrEngine>,
    pub knowledge: Arc<dyn KnowledgeBase>,
    pub grading: Arc<dyn GradingEngine>,
    pub store: Arc<dyn ImageStore>,
}

impl Collaborators {
    /// 按配置构造 HTTP 客户端
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self {
            detector: Arc::new(DetectionClient::new(config)?),
            ocr: Arc::new(OcrClient::new(config)?),
            knowledge: Arc::new(KnowledgeClient::new(config)?),
            grading: Arc::new(GradingClient::new(config)?),
            store: Arc::new(StorageClient::new(config)?),
        })
    }
}

/// 整页处理器
pub struct PageProcessor {
    detector: Arc<dyn Detector>,
    ocr: Arc<dyn OcrEngine>,
    splitter: QuestionSplitter,
    grader: PageGrader,
}

impl PageProcessor {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        let retrieval = RetrievalService::new(collaborators.knowledge, config.query_max_chars);
        let grading = GradingService::new(collaborators.grading);
        let flow = Arc::new(QuestionFlow::new(retrieval, grading, collaborators.store));

        Self {
            detector: collaborators.detector,
            ocr: collaborators.ocr,
            splitter: QuestionSplitter::new(config.processed_folder.as_ref().map(PathBuf::from)),
            grader: PageGrader::new(flow, config.max_workers),
        }
    }

    /// 处理一页作业图片
    pub async fn process(&self, path: &Path) -> AppResult<PageReport> {
        let started = Instant::now();
        let bytes = read_page(path)?;
        let page_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".to_string());

        log_page_start(path, bytes.len());
        let page = image::load_from_memory(&bytes)?;
        let mut timings = StageTimings::default();

        // ========== 步骤1: 题目分割 ==========
        info!("=== 步骤1: 开始题目分割 ===");
        let step = Instant::now();
        let detection = self.detector.detect(&bytes).await.map_err(|e| {
            error!("❌ 题目分割失败: {}", e);
            e
        })?;
        let regions = build_regions(&detection);
        timings.segmentation_secs = step.elapsed().as_secs_f64();

        // ========== 步骤2: OCR识别 ==========
        info!("=== 步骤2: 开始OCR识别 ===");
        let step = Instant::now();
        let ocr = self.ocr.recognize(&bytes).await.map_err(|e| {
            error!("❌ OCR识别失败: {}", e);
            e
        })?;
        let ocr_text = ocr.full_text();
        timings.ocr_secs = step.elapsed().as_secs_f64();
        info!("OCR识别完成，识别文本长度: {}", ocr_text.chars().count());

        // ========== 步骤3: 区域提取与裁剪 ==========
        info!("=== 步骤3: 开始题目分割与处理 ===");
        let step = Instant::now();
        let contents = extract_regions(&regions, &ocr);
        let questions = self.splitter.split(&page, &page_name, &regions, &contents);
        timings.split_secs = step.elapsed().as_secs_f64();

        // ========== 步骤4: 检索与批改 ==========
        info!("=== 步骤4: 开始原题检索和AI批改 ===");
        let step = Instant::now();
        let total_questions = questions.len();
        let grading = self.grader.grade_page(&page_name, questions).await;
        timings.grading_secs = step.elapsed().as_secs_f64();

        let report = PageReport {
            success: true,
            total_questions,
            successful_grading: grading.successful,
            results: grading.records,
            processing_time_secs: started.elapsed().as_secs_f64(),
            stage_timings: timings,
            ocr_text,
        };

        log_page_complete(&report);
        Ok(report)
    }
}

fn read_page(path: &Path) -> AppResult<Vec<u8>> {
    if !path.exists() {
        return Err(InputError::PageNotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    std::fs::read(path).map_err(|source| {
        InputError::ReadFailed {
            path: path.display().to_string(),
            source,
        }
        .into()
    })
}

// ========== 日志辅助函数 ==========

fn log_page_start(path: &Path, size: usize) {
    info!("{}", "=".repeat(60));
    info!("📄 开始处理作业: {}", path.display());
    info!("📊 文件大小: {} 字节", size);
    info!("{}", "=".repeat(60));
}

fn log_page_complete(report: &PageReport) {
    let t = &report.stage_timings;
    info!("\n{}", "=".repeat(60));
    info!(
        "✅ 作业处理完成，总用时: {:.2}秒，成功批改: {}/{} 题",
        report.processing_time_secs, report.successful_grading, report.total_questions
    );
    info!(
        "处理统计: 题目分割({:.2}s) + OCR识别({:.2}s) + 题目处理({:.2}s) + 检索批改({:.2}s)",
        t.segmentation_secs, t.ocr_secs, t.split_secs, t.grading_secs
    );
    info!("{}", "=".repeat(60));
}
