//! 几何工具 - 纯函数
//!
//! 检测框（轴对齐矩形）与 OCR 四边形（8 个浮点数）之间的重叠 / 包含判断。
//! 坐标数据是"尽力而为"的：残缺的四边形只会让判断返回 `false`，不会报错。

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 轴对齐矩形（页面像素坐标，`x1 <= x2`，`y1 <= y2`）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// 点是否落在矩形内（含边界）
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.x1 <= x && x <= self.x2 && self.y1 <= y && y <= self.y2
    }

    /// 两个矩形的外接矩形
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }
}

/// OCR 四边形：`[x1,y1,x2,y2,x3,y3,x4,y4]`，不一定轴对齐
///
/// 保留原始数值序列，长度不足 8 或含非数字项时仍可反序列化，由判断函数负责降级。
/// 非数字项记为 NaN，占住原位，后面的坐标不会错位。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Polygon8(pub Vec<f64>);

impl<'de> Deserialize<'de> for Polygon8 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let points = match value {
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_f64().unwrap_or(f64::NAN))
                .collect(),
            _ => Vec::new(),
        };
        Ok(Polygon8(points))
    }
}

impl Polygon8 {
    pub fn is_well_formed(&self) -> bool {
        self.0.len() >= 8 && self.0.iter().take(8).all(|v| v.is_finite())
    }

    /// 轴对齐外接矩形，残缺时返回 `None`
    pub fn aabb(&self) -> Option<Rect> {
        quad_to_aabb(&self.0)
    }
}

impl From<[f64; 8]> for Polygon8 {
    fn from(points: [f64; 8]) -> Self {
        Polygon8(points.to_vec())
    }
}

/// 两个轴对齐矩形是否重叠（边界接触也算重叠）
///
/// 文本块 vs 题目区域、detail 格式 position vs 题目区域都使用这一个判断。
pub fn boxes_overlap(a: &Rect, b: &Rect) -> bool {
    !(a.x2 < b.x1 || a.x1 > b.x2 || a.y2 < b.y1 || a.y1 > b.y2)
}

/// 四边形的轴对齐外接矩形
pub fn quad_to_aabb(points: &[f64]) -> Option<Rect> {
    if points.len() < 8 || points.iter().take(8).any(|v| !v.is_finite()) {
        return None;
    }

    let xs = [points[0], points[2], points[4], points[6]];
    let ys = [points[1], points[3], points[5], points[7]];

    Some(Rect {
        x1: xs.iter().copied().fold(f64::INFINITY, f64::min),
        y1: ys.iter().copied().fold(f64::INFINITY, f64::min),
        x2: xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        y2: ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

/// 四边形外接矩形的中心点是否落在区域内
///
/// 用于字符归属，比 [`boxes_overlap`] 严格：要求真正包含而非仅仅相交。
pub fn center_in_region(polygon: &Polygon8, region: &Rect) -> bool {
    match polygon.aabb() {
        Some(aabb) => {
            let (cx, cy) = aabb.center();
            region.contains_point(cx, cy)
        }
        None => false,
    }
}
