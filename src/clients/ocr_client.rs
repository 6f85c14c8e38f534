/// OCR 服务客户端
///
/// 请求头携带 `x-ti-app-id` / `x-ti-secret-code`，响应 `code != 200` 视为业务错误
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::info;

use super::{decode_json, OcrEngine};
use crate::config::Config;
use crate::error::{ApiError, AppResult};
use crate::infrastructure::{DecodePolicy, HttpExecutor, RetryPolicy};
use crate::models::payload::OcrResponse;

pub struct OcrClient {
    executor: HttpExecutor,
    api_url: String,
    app_id: String,
    secret_code: String,
}

impl OcrClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            executor: HttpExecutor::new(
                config.request_timeout(),
                RetryPolicy::new(config.max_retries, config.retry_delay()),
            )?,
            api_url: config.ocr_api_url.clone(),
            app_id: config.ocr_app_id.clone(),
            secret_code: config.ocr_secret_code.clone(),
        })
    }
}

#[async_trait]
impl OcrEngine for OcrClient {
    async fn recognize(&self, image: &[u8]) -> AppResult<OcrResponse> {
        info!("调用 OCR 服务，图片大小: {} 字节", image.len());

        let response: OcrResponse = self
            .executor
            .send_with_retry(
                "ocr",
                |client| {
                    client
                        .post(&self.api_url)
                        .header("x-ti-app-id", &self.app_id)
                        .header("x-ti-secret-code", &self.secret_code)
                        .header(CONTENT_TYPE, "application/octet-stream")
                        .body(image.to_vec())
                },
                decode_json,
                DecodePolicy::FailFast,
            )
            .await?;

        if response.code != 200 {
            return Err(ApiError::BadResponse {
                endpoint: "ocr".to_string(),
                code: Some(response.code),
                message: response.message,
            }
            .into());
        }

        Ok(response)
    }
}
