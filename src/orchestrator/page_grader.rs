//! 并发批改器 - 编排层
//!
//! 每道题一个 tokio 任务，Semaphore 控制同时进行的题目数量。
//! 结果数组在开始前按题目数量分配好，第 i 个任务只写第 i 个位置，
//! 输出顺序因此与完成顺序无关；唯一共享的可变状态是成功计数。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::models::grading::{GradingOutcome, GradingRecord};
use crate::models::question::Question;
use crate::workflow::question_flow::build_record;
use crate::workflow::{QuestionCtx, QuestionFlow};

/// 一页题目的批改结果
#[derive(Debug, Default)]
pub struct PageGrading {
    /// 与输入题目一一对应，`records[i].question_id == questions[i].question_id`
    pub records: Vec<GradingRecord>,
    /// 批改调用成功的题目数
    pub successful: usize,
}

/// 并发批改器
pub struct PageGrader {
    flow: Arc<QuestionFlow>,
    max_workers: usize,
}

impl PageGrader {
    pub fn new(flow: Arc<QuestionFlow>, max_workers: usize) -> Self {
        Self {
            flow,
            max_workers: max_workers.max(1),
        }
    }

    /// 批改一页的全部题目
    ///
    /// 没有题目时直接返回空结果，不启动任何任务。
    pub async fn grade_page(&self, page_name: &str, questions: Vec<Question>) -> PageGrading {
        let total = questions.len();
        if total == 0 {
            warn!("⚠️ 没有检测到任何题目，跳过批改步骤");
            return PageGrading::default();
        }

        let workers = total.min(self.max_workers);
        info!("启动 {} 个并发任务处理 {} 道题目", workers, total);

        let semaphore = Arc::new(Semaphore::new(workers));
        let successful = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(total);
        // 任务异常退出时使用的兜底结果
        let mut fallbacks = Vec::with_capacity(total);

        for question in questions {
            let ctx = QuestionCtx::new(page_name, question.question_id, total);
            fallbacks.push(build_record(
                &question,
                None,
                GradingOutcome::failed("任务执行失败"),
                question.image_name.clone(),
            ));

            let semaphore = semaphore.clone();
            let flow = self.flow.clone();
            let counter = successful.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let record = flow.run(&question, &ctx).await;
                if record.grading.success {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
                record
            }));
        }

        // join_all 保持提交顺序，每个任务的结果放回它自己的位置
        let records: Vec<GradingRecord> = join_all(handles)
            .await
            .into_iter()
            .zip(fallbacks)
            .map(|(joined, fallback)| match joined {
                Ok(record) => record,
                Err(e) => {
                    error!("[题目 {}] 任务执行失败: {}", fallback.question_id, e);
                    GradingRecord {
                        grading: GradingOutcome::failed(format!("任务执行失败: {}", e)),
                        ..fallback
                    }
                }
            })
            .collect();

        let successful = successful.load(Ordering::SeqCst);
        info!("✓ 检索和批改完成，成功批改: {}/{} 题", successful, total);

        PageGrading {
            records,
            successful,
        }
    }
}
