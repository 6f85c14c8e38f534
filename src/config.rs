//! 程序配置
//!
//! 配置来源（后者覆盖前者）：内置默认值 → TOML 文件（`GRADER_CONFIG`）→ 环境变量

use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 题目分割（检测）服务 ---
    pub segmentation_api_url: String,
    pub segmentation_api_token: String,
    // --- OCR 服务 ---
    pub ocr_api_url: String,
    pub ocr_app_id: String,
    pub ocr_secret_code: String,
    // --- 知识库检索服务 ---
    pub knowledge_api_url: String,
    pub knowledge_api_token: String,
    pub knowledge_dataset_id: String,
    /// 检索返回条数
    pub retrieval_top_k: u32,
    /// 检索相似度阈值
    pub retrieval_score_threshold: f64,
    // --- AI 批改服务 ---
    pub grading_api_url: String,
    pub grading_api_token: String,
    pub grading_user: String,
    // --- 对象存储服务 ---
    pub storage_upload_url: String,
    pub storage_upload_token: String,
    // --- 超时 ---
    pub request_timeout_secs: u64,
    pub knowledge_connect_timeout_secs: u64,
    pub knowledge_read_timeout_secs: u64,
    pub storage_timeout_secs: u64,
    // --- 重试 ---
    pub max_retries: usize,
    pub retry_delay_ms: u64,
    // --- 流水线 ---
    /// 同时批改的题目数量上限
    pub max_workers: usize,
    /// 检索查询文本的最大字符数
    pub query_max_chars: usize,
    /// 裁剪图片保存目录（为空则不落盘）
    pub processed_folder: Option<String>,
    // --- 日志 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub log_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            segmentation_api_url:
                "http://1265037983932887.cn-shanghai.pai-eas.aliyuncs.com/api/predict/yolox250701"
                    .to_string(),
            segmentation_api_token: String::new(),
            ocr_api_url: "https://api.textin.com/ai/service/v1/pdf_to_markdown?char_details=1"
                .to_string(),
            ocr_app_id: String::new(),
            ocr_secret_code: String::new(),
            knowledge_api_url: "https://agent-aireader.5rs.me".to_string(),
            knowledge_api_token: String::new(),
            knowledge_dataset_id: String::new(),
            retrieval_top_k: 5,
            retrieval_score_threshold: 0.6,
            grading_api_url: "https://agent.raysgo.com/v1/workflows/run".to_string(),
            grading_api_token: String::new(),
            grading_user: "homework-grader".to_string(),
            storage_upload_url: "https://adviser.raysgo.com/raysserve/v1.0/readArticle/obsUpload"
                .to_string(),
            storage_upload_token: String::new(),
            request_timeout_secs: 60,
            knowledge_connect_timeout_secs: 15,
            knowledge_read_timeout_secs: 45,
            storage_timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 1000,
            max_workers: 20,
            query_max_chars: 250,
            processed_folder: None,
            verbose_logging: false,
            log_file: None,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → `GRADER_CONFIG` 指向的 TOML 文件 → 环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("GRADER_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(Path::new(&path))?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(self) -> Self {
        let d = self;
        Self {
            segmentation_api_url: env_string("SEGMENTATION_API_URL").unwrap_or(d.segmentation_api_url),
            segmentation_api_token: env_string("SEGMENTATION_API_TOKEN").unwrap_or(d.segmentation_api_token),
            ocr_api_url: env_string("OCR_API_URL").unwrap_or(d.ocr_api_url),
            ocr_app_id: env_string("OCR_APP_ID").unwrap_or(d.ocr_app_id),
            ocr_secret_code: env_string("OCR_SECRET_CODE").unwrap_or(d.ocr_secret_code),
            knowledge_api_url: env_string("KNOWLEDGE_API_URL").unwrap_or(d.knowledge_api_url),
            knowledge_api_token: env_string("KNOWLEDGE_API_TOKEN").unwrap_or(d.knowledge_api_token),
            knowledge_dataset_id: env_string("KNOWLEDGE_DATASET_ID").unwrap_or(d.knowledge_dataset_id),
            retrieval_top_k: env_parse("RETRIEVAL_TOP_K").unwrap_or(d.retrieval_top_k),
            retrieval_score_threshold: env_parse("RETRIEVAL_SCORE_THRESHOLD").unwrap_or(d.retrieval_score_threshold),
            grading_api_url: env_string("AI_GRADING_API_URL").unwrap_or(d.grading_api_url),
            grading_api_token: env_string("AI_GRADING_API_TOKEN").unwrap_or(d.grading_api_token),
            grading_user: env_string("AI_GRADING_USER").unwrap_or(d.grading_user),
            storage_upload_url: env_string("STORAGE_UPLOAD_URL").unwrap_or(d.storage_upload_url),
            storage_upload_token: env_string("STORAGE_UPLOAD_TOKEN").unwrap_or(d.storage_upload_token),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT").unwrap_or(d.request_timeout_secs),
            knowledge_connect_timeout_secs: env_parse("KNOWLEDGE_CONNECT_TIMEOUT").unwrap_or(d.knowledge_connect_timeout_secs),
            knowledge_read_timeout_secs: env_parse("KNOWLEDGE_READ_TIMEOUT").unwrap_or(d.knowledge_read_timeout_secs),
            storage_timeout_secs: env_parse("STORAGE_TIMEOUT").unwrap_or(d.storage_timeout_secs),
            max_retries: env_parse("MAX_RETRIES").unwrap_or(d.max_retries),
            retry_delay_ms: env_parse("RETRY_DELAY_MS").unwrap_or(d.retry_delay_ms),
            max_workers: env_parse("MAX_WORKERS").unwrap_or(d.max_workers),
            query_max_chars: env_parse("QUERY_MAX_CHARS").unwrap_or(d.query_max_chars),
            processed_folder: env_string("PROCESSED_FOLDER").or(d.processed_folder),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(d.verbose_logging),
            log_file: env_string("LOG_FILE").or(d.log_file),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
