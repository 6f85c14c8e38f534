//! 业务能力层（Services）
//!
//! 描述"我能做什么"，每次只处理一道题，不关心流程顺序。
//!
//! - `RetrievalService` - 知识库检索能力（空查询拦截、截断、结果整理）
//! - `GradingService` - AI 批改能力（组装请求、解析结论）
//! - `retrieval_parser` / `grading_parser` - 半结构化响应的解析

pub mod grading_parser;
pub mod grading_service;
pub mod retrieval_parser;
pub mod retrieval_service;

pub use grading_service::GradingService;
pub use retrieval_service::RetrievalService;
