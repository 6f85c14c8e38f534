/// AI 批改服务客户端（workflow 接口，阻塞模式）
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{decode_json, GradingEngine, GradingRequest};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{DecodePolicy, HttpExecutor, RetryPolicy};

pub struct GradingClient {
    executor: HttpExecutor,
    api_url: String,
    token: String,
    user: String,
}

impl GradingClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            executor: HttpExecutor::new(
                config.request_timeout(),
                RetryPolicy::new(config.max_retries, config.retry_delay()),
            )?,
            api_url: config.grading_api_url.clone(),
            token: config.grading_api_token.clone(),
            user: config.grading_user.clone(),
        })
    }

    /// 构造 workflow 请求体：作答图片在前，参考图片按顺序追加
    pub fn build_payload(&self, request: &GradingRequest) -> Value {
        let files: Vec<Value> = std::iter::once(&request.image_url)
            .chain(request.reference_image_urls.iter())
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                json!({
                    "type": "image",
                    "transfer_method": "remote_url",
                    "url": url
                })
            })
            .collect();

        json!({
            "inputs": {
                "user_question_ocr": request.user_question_ocr
            },
            "user": self.user,
            "response_mode": "blocking",
            "files": files
        })
    }
}

#[async_trait]
impl GradingEngine for GradingClient {
    async fn run(&self, request: &GradingRequest) -> AppResult<Value> {
        let payload = self.build_payload(request);
        info!(
            "调用 AI 批改服务，附带图片 {} 张",
            payload["files"].as_array().map(Vec::len).unwrap_or(0)
        );
        debug!("批改请求体: {}", payload);

        // 批改服务偶尔返回非 JSON 内容，解析失败也重试
        self.executor
            .send_with_retry(
                "grading",
                |client| {
                    client
                        .post(&self.api_url)
                        .bearer_auth(&self.token)
                        .json(&payload)
                },
                decode_json,
                DecodePolicy::Retry,
            )
            .await
    }
}
