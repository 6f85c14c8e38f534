//! # Homework Grader
//!
//! 作业拍照批改流水线：整页图片 → 题目区域 → 逐题检索原题 → AI 批改 → 按题号排列的结果
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 纯计算（Geometry / Extraction）
//! - `geometry` - 检测框与 OCR 四边形的重叠、包含判断
//! - `extraction/` - 区域排序、文本与字符归属、按区域裁剪
//!
//! ### ② 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有 HTTP 连接池，只暴露"带重试地发请求"的能力
//! - `clients/` - 各外部服务的 trait 与 HTTP 实现（检测 / OCR / 知识库 / 批改 / 存储）
//!
//! ### ③ 业务能力层（Services）
//! - `RetrievalService` - 知识库检索能力
//! - `GradingService` - AI 批改能力
//! - `retrieval_parser` / `grading_parser` - 半结构化响应解析
//!
//! ### ④ 流程层（Workflow）
//! - `QuestionCtx` - 上下文封装（页面 + 题号）
//! - `QuestionFlow` - 单题流程（检索 → 上传 → 批改）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/page_processor` - 整页处理：分割 → OCR → 提取 → 裁剪 → 批改
//! - `orchestrator/page_grader` - 有界并发批改，结果按题号就位
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod extraction;
pub mod geometry;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{GradingRecord, PageReport, Question, RetrievalMatch};
pub use orchestrator::{Collaborators, PageGrader, PageProcessor};
pub use workflow::{QuestionCtx, QuestionFlow};
