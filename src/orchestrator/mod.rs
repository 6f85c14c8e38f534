//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整页处理和并发调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `page_processor` - 整页处理器
//! - 读取页面图片
//! - 依次调用题目分割、OCR
//! - 区域提取与题目裁剪
//! - 汇总各阶段耗时，生成 `PageReport`
//!
//! ### `page_grader` - 并发批改器
//! - 每道题一个任务，Semaphore 限制并发数（最多 `max_workers`）
//! - 结果按 `question_id - 1` 写入预分配的位置，与完成顺序无关
//! - 单题失败只影响该题的结果
//!
//! ## 层次关系
//!
//! ```text
//! page_processor (处理一页)
//!     ↓
//! page_grader (处理 Vec<Question>)
//!     ↓
//! workflow::QuestionFlow (处理单个 Question)
//!     ↓
//! services (能力层：retrieval / grading)
//!     ↓
//! clients + infrastructure (外部服务：HttpExecutor)
//! ```

pub mod page_grader;
pub mod page_processor;

pub use page_grader::{PageGrader, PageGrading};
pub use page_processor::{Collaborators, PageProcessor};
