/// 题目分割服务客户端
///
/// 原始图片字节直接作为请求体，`Authorization` 头携带 token
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::info;

use super::{decode_json, Detector};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{DecodePolicy, HttpExecutor, RetryPolicy};
use crate::models::payload::DetectionResponse;

pub struct DetectionClient {
    executor: HttpExecutor,
    api_url: String,
    token: String,
}

impl DetectionClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            executor: HttpExecutor::new(
                config.request_timeout(),
                RetryPolicy::new(config.max_retries, config.retry_delay()),
            )?,
            api_url: config.segmentation_api_url.clone(),
            token: config.segmentation_api_token.clone(),
        })
    }
}

#[async_trait]
impl Detector for DetectionClient {
    async fn detect(&self, image: &[u8]) -> AppResult<DetectionResponse> {
        info!("调用题目分割服务，图片大小: {} 字节", image.len());

        self.executor
            .send_with_retry(
                "segmentation",
                |client| {
                    client
                        .post(&self.api_url)
                        .header(AUTHORIZATION, &self.token)
                        .header(CONTENT_TYPE, "application/octet-stream")
                        .body(image.to_vec())
                },
                decode_json::<DetectionResponse>,
                DecodePolicy::FailFast,
            )
            .await
    }
}
