//! 对象存储上传客户端
//!
//! multipart 上传，只尝试一次

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use super::ImageStore;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DecodePolicy, HttpExecutor, RetryPolicy};

pub struct StorageClient {
    executor: HttpExecutor,
    upload_url: String,
    token: String,
}

impl StorageClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            executor: HttpExecutor::new(
                Duration::from_secs(config.storage_timeout_secs),
                RetryPolicy::single_attempt(),
            )?,
            upload_url: config.storage_upload_url.clone(),
            token: config.storage_upload_token.clone(),
        })
    }
}

/// 从上传响应中取出 URL：`data.url` → `url` → 非 JSON 时整个响应文本
pub fn extract_upload_url(body: &str) -> AppResult<String> {
    let url = match serde_json::from_str::<Value>(body) {
        Ok(value) => value
            .pointer("/data/url")
            .and_then(Value::as_str)
            .or_else(|| value.get("url").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
        Err(_) => body.trim().to_string(),
    };

    if url.is_empty() {
        return Err(AppError::malformed("storage", "上传响应中没有 URL"));
    }
    Ok(url)
}

#[async_trait]
impl ImageStore for StorageClient {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
        info!("上传图片到对象存储: {} ({} 字节)", file_name, bytes.len());

        let url = self
            .executor
            .send_with_retry(
                "storage",
                |client| {
                    let part = Part::bytes(bytes.clone())
                        .file_name(file_name.to_string())
                        .mime_str("image/jpeg")
                        .unwrap_or_else(|_| Part::bytes(bytes.clone()).file_name(file_name.to_string()));
                    client
                        .post(&self.upload_url)
                        .header("token", &self.token)
                        .multipart(Form::new().part("file", part))
                },
                extract_upload_url,
                DecodePolicy::FailFast,
            )
            .await?;

        info!("✓ 上传成功: {}", url);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http_executor::tests::spawn_server;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_extract_upload_url() {
        assert_eq!(
            extract_upload_url(r#"{"data":{"url":"https://obs/a.jpg"}}"#).unwrap(),
            "https://obs/a.jpg"
        );
        assert_eq!(
            extract_upload_url(r#"{"url":"https://obs/b.jpg"}"#).unwrap(),
            "https://obs/b.jpg"
        );
        assert_eq!(extract_upload_url("https://obs/c.jpg\n").unwrap(), "https://obs/c.jpg");
        assert!(extract_upload_url(r#"{"code":500}"#).is_err());
    }

    #[tokio::test]
    async fn test_failed_upload_is_not_retried() {
        let (url, hits) =
            spawn_server(vec![(500, "x"), (200, r#"{"data":{"url":"https://obs/a.jpg"}}"#)]).await;
        let config = Config {
            storage_upload_url: url,
            ..Default::default()
        };
        let client = StorageClient::new(&config).unwrap();

        let result = client.upload("p_question_1.jpg", vec![0xFF, 0xD8, 0xFF]).await;

        assert!(result.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
