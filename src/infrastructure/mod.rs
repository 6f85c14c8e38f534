//! 基础设施层
//!
//! 持有 HTTP 连接池，只暴露"带重试地发请求"的能力，不认识题目和批改。

pub mod http_executor;

pub use http_executor::{DecodePolicy, HttpExecutor, RetryPolicy};
