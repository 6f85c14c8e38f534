//! 外部服务客户端
//!
//! 每个外部服务对应一个 trait，流水线只依赖 trait，
//! 具体的 HTTP 实现在启动时构造后以 `Arc<dyn ...>` 注入，测试中可以替换为内存实现。

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppResult;
use crate::models::payload::{DetectionResponse, OcrResponse};

pub mod detection_client;
pub mod grading_client;
pub mod knowledge_client;
pub mod ocr_client;
pub mod storage_client;

pub use detection_client::DetectionClient;
pub use grading_client::GradingClient;
pub use knowledge_client::KnowledgeClient;
pub use ocr_client::OcrClient;
pub use storage_client::StorageClient;

/// 题目分割（检测）服务
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, image: &[u8]) -> AppResult<DetectionResponse>;
}

/// OCR 服务
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> AppResult<OcrResponse>;
}

/// 知识库检索服务，返回原始响应（`records` 数组）
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn retrieve(&self, query: &str) -> AppResult<Value>;
}

/// 发给批改服务的一次请求
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradingRequest {
    /// 学生作答图片（已上传）
    pub image_url: String,
    /// 字符级坐标 JSON 字符串
    pub user_question_ocr: String,
    /// 知识库中的题目图 / 答案图
    pub reference_image_urls: Vec<String>,
}

/// AI 批改服务，返回原始响应
#[async_trait]
pub trait GradingEngine: Send + Sync {
    async fn run(&self, request: &GradingRequest) -> AppResult<Value>;
}

/// 对象存储，上传后返回可访问的 URL
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String>;
}

/// 把响应文本解析为 JSON
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(body: &str) -> AppResult<T> {
    Ok(serde_json::from_str(body)?)
}
