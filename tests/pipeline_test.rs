use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use homework_grader::clients::{
    Detector, GradingEngine, GradingRequest, ImageStore, KnowledgeBase, OcrEngine,
};
use homework_grader::error::{ApiError, AppError, AppResult, InputError};
use homework_grader::models::payload::{DetectionResponse, OcrResponse};
use homework_grader::utils::logging;
use homework_grader::{Collaborators, Config, PageProcessor};
use image::{Rgba, RgbaImage};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

// ========== 内存实现的外部服务 ==========

struct FixedDetector(Value);

#[async_trait]
impl Detector for FixedDetector {
    async fn detect(&self, _image: &[u8]) -> AppResult<DetectionResponse> {
        Ok(serde_json::from_value(self.0.clone())?)
    }
}

struct FixedOcr(Value);

#[async_trait]
impl OcrEngine for FixedOcr {
    async fn recognize(&self, _image: &[u8]) -> AppResult<OcrResponse> {
        Ok(serde_json::from_value(self.0.clone())?)
    }
}

#[derive(Default)]
struct CountingKnowledge {
    calls: AtomicUsize,
}

#[async_trait]
impl KnowledgeBase for CountingKnowledge {
    async fn retrieve(&self, query: &str) -> AppResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "records": [{
                "score": 0.9,
                "source": "题库.docx",
                "segment": {"content": format!("\"题目文本\":\"{}\";\"答案文本\":\"略\"", query)}
            }]
        }))
    }
}

/// 上传后返回 `https://obs/<文件名>`
#[derive(Default)]
struct MemoryStore {
    calls: AtomicUsize,
}

#[async_trait]
impl ImageStore for MemoryStore {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!bytes.is_empty());
        Ok(format!("https://obs/{}", file_name))
    }
}

/// 第 `failing` 题的批改总是超时；靠前的题目完成得更晚，打乱完成顺序
struct FlakyGrader {
    failing: Option<usize>,
    calls: AtomicUsize,
}

impl FlakyGrader {
    fn new(failing: Option<usize>) -> Self {
        Self {
            failing,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GradingEngine for FlakyGrader {
    async fn run(&self, request: &GradingRequest) -> AppResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let id: usize = request
            .image_url
            .rsplit("_question_")
            .next()
            .and_then(|s| s.trim_end_matches(".jpg").parse().ok())
            .unwrap_or(0);

        tokio::time::sleep(Duration::from_millis(60u64.saturating_sub(id as u64 * 20))).await;

        if Some(id) == self.failing {
            return Err(AppError::Api(ApiError::Timeout {
                endpoint: "grading".to_string(),
            }));
        }

        Ok(json!({
            "data": {"outputs": {
                "result": "[{\"isRight\": true, \"answerAreaPosition\": [1, 2, 3, 4]}]",
                "text": "回答正确"
            }}
        }))
    }
}

// ========== 测试夹具 ==========

struct Harness {
    knowledge: Arc<CountingKnowledge>,
    store: Arc<MemoryStore>,
    grader: Arc<FlakyGrader>,
    processor: PageProcessor,
}

fn harness(detection: Value, ocr: Value, failing: Option<usize>) -> Harness {
    let knowledge = Arc::new(CountingKnowledge::default());
    let store = Arc::new(MemoryStore::default());
    let grader = Arc::new(FlakyGrader::new(failing));

    let collaborators = Collaborators {
        detector: Arc::new(FixedDetector(detection)),
        ocr: Arc::new(FixedOcr(ocr)),
        knowledge: knowledge.clone(),
        grading: grader.clone(),
        store: store.clone(),
    };

    let config = Config {
        max_workers: 2,
        log_file: None,
        processed_folder: None,
        ..Default::default()
    };

    Harness {
        knowledge,
        store,
        grader,
        processor: PageProcessor::new(&config, collaborators),
    }
}

/// 在临时目录写一张带透明通道的 PNG
fn write_page(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("grader_pipeline_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("创建临时目录失败");
    let path = dir.join(format!("{}.png", name));
    RgbaImage::from_pixel(120, 200, Rgba([255, 255, 255, 200]))
        .save(&path)
        .expect("写入测试图片失败");
    path
}

fn three_questions() -> Value {
    json!({
        "success": true,
        // 检测顺序与页面顺序不同
        "detection_boxes": [[0, 130, 100, 180], [0, 0, 100, 50], [0, 60, 100, 110]],
        "detection_scores": [0.9, 0.95, 0.8],
        "detection_classes": [0, 0, 0],
        "detection_class_names": ["question", "question", "question"],
        "ori_img_shape": [200, 120, 3]
    })
}

fn quad(x1: f64, y1: f64, x2: f64, y2: f64) -> Value {
    json!([x1, y1, x2, y1, x2, y2, x1, y2])
}

fn three_spans() -> Value {
    json!({
        "code": 200,
        "result": {
            "markdown": "1+1=2\n3+4=7\n5+5=10",
            "pages": [{"content": [
                {"text": "1+1=2", "pos": quad(10.0, 10.0, 60.0, 30.0),
                 "char_pos": [quad(10.0, 10.0, 20.0, 30.0), quad(20.0, 10.0, 30.0, 30.0),
                              quad(30.0, 10.0, 40.0, 30.0), quad(40.0, 10.0, 50.0, 30.0),
                              quad(50.0, 10.0, 60.0, 30.0)]},
                {"text": "3+4=7", "pos": quad(10.0, 70.0, 60.0, 90.0)},
                {"text": "5+5=10", "pos": quad(10.0, 140.0, 60.0, 160.0)}
            ]}]
        }
    })
}

// ========== 测试用例 ==========

#[tokio::test]
async fn test_failure_is_isolated_to_one_question() {
    let h = harness(three_questions(), three_spans(), Some(2));
    let page = write_page("isolation");

    let report = assert_ok!(h.processor.process(&page).await);

    assert!(report.success);
    assert_eq!(report.total_questions, 3);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.successful_grading, 2);

    assert!(report.results[0].grading.success);
    assert!(!report.results[1].grading.success);
    assert!(report.results[1].grading.error.as_deref().unwrap_or_default().contains("超时"));
    assert!(report.results[2].grading.success);
    assert_eq!(h.grader.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_results_follow_page_order() {
    let h = harness(three_questions(), three_spans(), None);
    let page = write_page("ordering");

    let report = assert_ok!(h.processor.process(&page).await);

    for (i, record) in report.results.iter().enumerate() {
        assert_eq!(record.question_id, i + 1);
        assert_eq!(record.image_ref, format!("https://obs/ordering_question_{}.jpg", i + 1));
    }

    assert_eq!(report.results[0].text, "1+1=2");
    assert_eq!(report.results[1].text, "3+4=7");
    assert_eq!(report.results[2].text, "5+5=10");
    assert_eq!(report.results[0].region.y1, 0);
    assert_eq!(report.results[2].region.y1, 130);

    let first = &report.results[0];
    assert_eq!(first.similarity_score, 0.9);
    assert_eq!(first.grading.score, Some(100));
    assert_eq!(first.grading.correct, Some(true));
    assert_eq!(first.grading.answer_area_position, Some(json!([1, 2, 3, 4])));
    assert_eq!(report.ocr_text, "1+1=2\n3+4=7\n5+5=10");
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_empty_page_skips_collaborators() {
    let detection = json!({"success": true, "detection_boxes": [], "detection_scores": []});
    let h = harness(detection, three_spans(), None);
    let page = write_page("empty");

    let report = assert_ok!(h.processor.process(&page).await);

    assert!(report.results.is_empty());
    assert_eq!(report.total_questions, 0);
    assert_eq!(report.successful_grading, 0);
    assert_eq!(h.knowledge.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.grader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_region_text_skips_retrieval_but_still_grades() {
    let detection = json!({
        "success": true,
        "detection_boxes": [[0, 0, 100, 50]],
        "detection_scores": [0.9],
        "detection_class_names": ["question"]
    });
    let ocr = json!({"code": 200, "result": {"pages": []}});
    let h = harness(detection, ocr, None);
    let page = write_page("blank");

    let report = assert_ok!(h.processor.process(&page).await);

    assert_eq!(report.results.len(), 1);
    assert!(report.results[0].text.is_empty());
    assert_eq!(report.results[0].similarity_score, 0.0);
    assert!(report.results[0].grading.success);
    assert_eq!(h.knowledge.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.grader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_page_is_input_error() {
    let h = harness(three_questions(), three_spans(), None);

    let err = assert_err!(h.processor.process(Path::new("/definitely/not/here.png")).await);

    assert!(matches!(err, AppError::Input(InputError::PageNotFound { .. })));
    assert_eq!(h.grader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_grade_live_page() {
    // 加载配置
    let config = Config::load().expect("加载配置失败");
    logging::init(&config).expect("初始化日志失败");

    // 注意：通过 GRADER_LIVE_PAGE 指定一张真实的作业图片
    let page = std::env::var("GRADER_LIVE_PAGE").expect("未设置 GRADER_LIVE_PAGE");

    let collaborators = Collaborators::from_config(&config).expect("创建客户端失败");
    let processor = PageProcessor::new(&config, collaborators);

    let report = processor.process(Path::new(&page)).await.expect("处理作业失败");

    assert_eq!(report.results.len(), report.total_questions);
    println!("{}", serde_json::to_string_pretty(&report).unwrap());
}
