//! HTTP 执行器 - 基础设施层
//!
//! 持有 `reqwest::Client`，统一实现外部服务的重试策略：
//! 传输错误或非 2xx 状态码时按固定间隔重试，用尽后返回结构化错误。

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ApiError, AppError, AppResult};

/// 重试策略：总尝试次数 + 固定间隔
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// 只尝试一次（对象存储上传）
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// 响应体解析失败时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// 直接返回错误
    FailFast,
    /// 当作一次失败的尝试，继续重试
    Retry,
}

/// HTTP 执行器
///
/// 职责：
/// - 持有唯一的 `reqwest::Client`（内部是连接池，clone 开销很小）
/// - 暴露 `send_with_retry()` 能力
/// - 不认识 Question / 批改结果
pub struct HttpExecutor {
    client: Client,
    policy: RetryPolicy,
}

impl HttpExecutor {
    /// 创建执行器，`timeout` 为单次请求的总超时
    pub fn new(timeout: Duration, policy: RetryPolicy) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::from_reqwest("http-client", e))?;
        Ok(Self { client, policy })
    }

    /// 连接超时与读取超时分开配置（知识库检索较慢）
    pub fn with_timeouts(
        connect_timeout: Duration,
        read_timeout: Duration,
        policy: RetryPolicy,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(connect_timeout + read_timeout)
            .build()
            .map_err(|e| AppError::from_reqwest("http-client", e))?;
        Ok(Self { client, policy })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// 发送请求并解析响应体，失败时按策略重试
    ///
    /// # 参数
    /// - `label`: 服务名称（用于日志和错误信息）
    /// - `build`: 每次尝试都重新构造请求（multipart 表单不能复用）
    /// - `decode`: 把响应文本解析成目标类型
    /// - `decode_policy`: 解析失败是否计入重试
    pub async fn send_with_retry<T, B, D>(
        &self,
        label: &str,
        build: B,
        decode: D,
        decode_policy: DecodePolicy,
    ) -> AppResult<T>
    where
        B: Fn(&Client) -> RequestBuilder,
        D: Fn(&str) -> AppResult<T>,
    {
        let max_attempts = self.policy.max_attempts;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            debug!("调用 {} (第 {}/{} 次)", label, attempt, max_attempts);

            match self.attempt(label, &build).await {
                Ok(body) => match decode(&body) {
                    Ok(value) => return Ok(value),
                    Err(e) if decode_policy == DecodePolicy::Retry => {
                        warn!("⚠️ {} 响应解析失败 (第 {}/{} 次): {}", label, attempt, max_attempts, e);
                        last_error = Some(e);
                    }
                    Err(e) => return Err(e),
                },
                Err(e) => {
                    warn!("⚠️ {} 调用失败 (第 {}/{} 次): {}", label, attempt, max_attempts, e);
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts {
                sleep(self.policy.delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::Other(format!("{} 调用失败，已重试 {} 次", label, max_attempts))
        }))
    }

    /// 单次尝试：发送 → 检查状态码 → 读取文本
    async fn attempt<B>(&self, label: &str, build: &B) -> AppResult<String>
    where
        B: Fn(&Client) -> RequestBuilder,
    {
        let response = build(&self.client)
            .send()
            .await
            .map_err(|e| AppError::from_reqwest(label, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::from_reqwest(label, e))?;

        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: label.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// 本地假服务：按顺序返回预设的 (状态码, 响应体)，最后一个重复使用
    pub(crate) async fn spawn_server(replies: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = replies[n.min(replies.len() - 1)];

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(read) => request.extend_from_slice(&buf[..read]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn executor(max_attempts: usize) -> HttpExecutor {
        HttpExecutor::new(
            Duration::from_secs(5),
            RetryPolicy::new(max_attempts, Duration::from_millis(10)),
        )
        .unwrap()
    }

    fn decode_json(body: &str) -> AppResult<serde_json::Value> {
        Ok(serde_json::from_str(body)?)
    }

    #[tokio::test]
    async fn test_retries_bad_status_then_succeeds() {
        let (url, hits) = spawn_server(vec![(500, "oops"), (200, r#"{"ok":true}"#)]).await;

        let value = executor(3)
            .send_with_retry("test", |c| c.get(&url), decode_json, DecodePolicy::FailFast)
            .await
            .unwrap();

        assert_eq!(value["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let (url, hits) = spawn_server(vec![(503, "busy")]).await;

        let err = executor(3)
            .send_with_retry("test", |c| c.get(&url), decode_json, DecodePolicy::FailFast)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Api(ApiError::BadStatus { status: 503, .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_decode_policy() {
        let (url, hits) = spawn_server(vec![(200, "not json"), (200, r#"{"n":1}"#)]).await;

        let err = executor(3)
            .send_with_retry("test", |c| c.get(&url), decode_json, DecodePolicy::FailFast)
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let value = executor(3)
            .send_with_retry("test", |c| c.get(&url), decode_json, DecodePolicy::Retry)
            .await
            .unwrap();
        assert_eq!(value["n"], 1);
    }

    #[tokio::test]
    async fn test_single_attempt_never_retries() {
        let (url, hits) = spawn_server(vec![(500, "x"), (200, r#"{"ok":true}"#)]).await;

        let executor =
            HttpExecutor::new(Duration::from_secs(5), RetryPolicy::single_attempt()).unwrap();
        let err = executor
            .send_with_retry("test", |c| c.get(&url), decode_json, DecodePolicy::FailFast)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Api(ApiError::BadStatus { status: 500, .. })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
