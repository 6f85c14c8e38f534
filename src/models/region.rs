//! 检测区域模型

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// 检测服务返回的题目边界框（像素坐标，已取整）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    /// 检测置信度
    pub confidence: f64,
    /// 检测类别名称
    pub class_name: String,
}

impl BoundingBox {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x1 as f64, self.y1 as f64, self.x2 as f64, self.y2 as f64)
    }

    pub fn width(&self) -> i64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i64 {
        self.y2 - self.y1
    }
}

/// 带稳定序号的题目区域
///
/// `question_id` 从 1 开始，按 `y1` 从上到下排序后分配；
/// `y1` 相同时保持检测服务的原始顺序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub question_id: usize,
    /// 在检测结果中的原始下标
    pub detector_index: usize,
    pub bbox: BoundingBox,
}

impl Region {
    pub fn rect(&self) -> Rect {
        self.bbox.rect()
    }
}
