//! 外部服务原始响应结构
//!
//! 所有字段都带默认值，缺字段不会导致整份响应解析失败。

use crate::geometry::Polygon8;
use crate::models::question::TextSpan;
use serde::{Deserialize, Serialize};

/// 题目分割（检测）服务响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionResponse {
    pub success: bool,
    /// `[x1, y1, x2, y2]`
    pub detection_boxes: Vec<Vec<f64>>,
    pub detection_scores: Vec<f64>,
    pub detection_classes: Vec<serde_json::Value>,
    pub detection_class_names: Vec<String>,
    /// 原图尺寸
    pub ori_img_shape: Vec<f64>,
}

/// OCR 服务响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrResponse {
    pub code: i64,
    pub message: String,
    pub result: OcrDocument,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrDocument {
    pub markdown: Option<String>,
    /// 字符级格式：页 → 内容 → 文本块（可带 `char_pos`）
    pub pages: Option<Vec<OcrPage>>,
    /// 粗粒度格式：只有文本块位置，没有字符坐标
    pub detail: Option<Vec<OcrDetailItem>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrPage {
    pub content: Vec<OcrContentItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrContentItem {
    pub text: Option<String>,
    pub pos: Option<Polygon8>,
    pub char_pos: Option<Vec<Polygon8>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrDetailItem {
    pub text: Option<String>,
    pub position: Option<Polygon8>,
}

/// 从 OCR 响应中整理出的文本块
#[derive(Debug, Clone, PartialEq)]
pub enum OcrSpans {
    /// 来自 `pages`，可能带字符坐标
    CharacterRich(Vec<TextSpan>),
    /// 来自 `detail`，只有整块坐标
    Coarse(Vec<TextSpan>),
    /// 两种结构都不存在
    Unrecognized,
}

impl OcrSpans {
    pub fn spans(&self) -> &[TextSpan] {
        match self {
            OcrSpans::CharacterRich(spans) | OcrSpans::Coarse(spans) => spans,
            OcrSpans::Unrecognized => &[],
        }
    }
}

impl OcrResponse {
    /// 按结构整理文本块，`pages` 与 `detail` 同时存在时优先 `pages`
    pub fn spans(&self) -> OcrSpans {
        if let Some(pages) = &self.result.pages {
            let spans = pages
                .iter()
                .flat_map(|page| page.content.iter())
                .filter_map(|item| {
                    let text = item.text.clone()?;
                    Some(TextSpan {
                        text,
                        polygon: item.pos.clone().unwrap_or_default(),
                        char_polygons: item.char_pos.clone(),
                    })
                })
                .collect();
            return OcrSpans::CharacterRich(spans);
        }

        if let Some(detail) = &self.result.detail {
            let spans = detail
                .iter()
                .filter_map(|item| {
                    let text = item.text.clone()?;
                    Some(TextSpan {
                        text,
                        polygon: item.position.clone().unwrap_or_default(),
                        char_polygons: None,
                    })
                })
                .collect();
            return OcrSpans::Coarse(spans);
        }

        OcrSpans::Unrecognized
    }

    /// 整页文本：markdown 优先，否则逐页拼接文本块
    pub fn full_text(&self) -> String {
        if let Some(markdown) = &self.result.markdown {
            return markdown.clone();
        }

        self.result
            .pages
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|page| {
                page.content
                    .iter()
                    .filter_map(|item| item.text.as_deref())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
