//! 提取层 - 纯计算，无网络调用
//!
//! - `region_extractor` - 检测框 → 有序题目区域；OCR 文本块 / 字符 → 按区域归属
//! - `question_splitter` - 按区域裁剪页面图片，组装成独立的 `Question`
//!
//! 两个模块都在并发批改之前同步执行。

pub mod question_splitter;
pub mod region_extractor;

pub use question_splitter::{flatten_alpha, split_questions, QuestionSplitter};
pub use region_extractor::{build_regions, extract_regions};
