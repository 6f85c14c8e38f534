//! 题目处理上下文
//!
//! 封装"我正在处理哪一页的第几题"这一信息

use std::fmt::Display;

/// 题目处理上下文（仅用于日志）
#[derive(Debug, Clone)]
pub struct QuestionCtx {
    /// 页面名称（图片文件名，不含扩展名）
    pub page_name: String,

    /// 题目序号（从1开始）
    pub question_id: usize,

    /// 本页题目总数
    pub total_questions: usize,
}

impl QuestionCtx {
    pub fn new(page_name: impl Into<String>, question_id: usize, total_questions: usize) -> Self {
        Self {
            page_name: page_name.into(),
            question_id,
            total_questions,
        }
    }
}

impl Display for QuestionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[题目 {}/{} 页面#{}]",
            self.question_id, self.total_questions, self.page_name
        )
    }
}
