/// 知识库检索客户端
///
/// 调用 `{base}/v1/datasets/{dataset_id}/retrieve`，混合检索 + 重排序
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::{decode_json, KnowledgeBase};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{DecodePolicy, HttpExecutor, RetryPolicy};

pub struct KnowledgeClient {
    executor: HttpExecutor,
    endpoint: String,
    token: String,
    top_k: u32,
    score_threshold: f64,
}

impl KnowledgeClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            executor: HttpExecutor::with_timeouts(
                Duration::from_secs(config.knowledge_connect_timeout_secs),
                Duration::from_secs(config.knowledge_read_timeout_secs),
                RetryPolicy::new(config.max_retries, config.retry_delay()),
            )?,
            endpoint: format!(
                "{}/v1/datasets/{}/retrieve",
                config.knowledge_api_url.trim_end_matches('/'),
                config.knowledge_dataset_id
            ),
            token: config.knowledge_api_token.clone(),
            top_k: config.retrieval_top_k,
            score_threshold: config.retrieval_score_threshold,
        })
    }

    /// 构造检索请求体
    pub fn build_payload(&self, query: &str) -> Value {
        json!({
            "query": query,
            "retrieval_model": {
                "search_method": "hybrid_search",
                "reranking_enable": true,
                "reranking_mode": "reranking_model",
                "reranking_model": {
                    "reranking_provider_name": "tongyi",
                    "reranking_model_name": "gte-rerank"
                },
                "weights": {
                    "weight_type": "customized",
                    "vector_setting": {
                        "vector_weight": 0.1,
                        "embedding_provider_name": "",
                        "embedding_model_name": ""
                    },
                    "keyword_setting": {
                        "keyword_weight": 0.9
                    }
                },
                "top_k": self.top_k,
                "score_threshold_enabled": true,
                "score_threshold": self.score_threshold
            }
        })
    }
}

#[async_trait]
impl KnowledgeBase for KnowledgeClient {
    async fn retrieve(&self, query: &str) -> AppResult<Value> {
        let payload = self.build_payload(query);
        info!("调用知识库检索: {}", self.endpoint);
        debug!("检索请求体: {}", payload);

        self.executor
            .send_with_retry(
                "knowledge",
                |client| {
                    client
                        .post(&self.endpoint)
                        .bearer_auth(&self.token)
                        .json(&payload)
                },
                decode_json,
                DecodePolicy::FailFast,
            )
            .await
    }
}
