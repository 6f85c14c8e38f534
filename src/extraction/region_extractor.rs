//! 区域提取器
//!
//! 把两套独立的坐标系对齐：
//! - 检测服务的题目框（轴对齐、整数像素）
//! - OCR 的文本块 / 字符四边形（浮点、可能旋转）
//!
//! 文本块与题目框用 [`boxes_overlap`] 判断归属，字符用 [`center_in_region`]。
//! 题目框重叠时同一个字符会同时归属多道题，这里不做去重。

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::geometry::{boxes_overlap, center_in_region, Rect};
use crate::models::payload::{DetectionResponse, OcrResponse, OcrSpans};
use crate::models::question::{CharGlyph, RegionContent, TextSpan};
use crate::models::region::{BoundingBox, Region};
use crate::utils::logging::truncate_text;

/// 解析检测结果，生成按 `y1` 排序的题目区域
///
/// - 框、分数、类别按下标配对，分数或类别缺失的框直接丢弃
/// - 每个框的 `x1/x2`、`y1/y2` 按大小重新排列，保证左上到右下
/// - 坐标向零取整
/// - 稳定排序，`y1` 相同时保持检测服务的原始顺序
/// - `success == false` 时返回空列表
pub fn build_regions(detection: &DetectionResponse) -> Vec<Region> {
    if !detection.success {
        error!("❌ 题目分割服务返回失败，不生成任何题目区域");
        return Vec::new();
    }

    info!(
        "检测到 {} 个边界框，原图尺寸: {:?}",
        detection.detection_boxes.len(),
        detection.ori_img_shape
    );

    let mut boxes: Vec<(usize, BoundingBox)> = detection
        .detection_boxes
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let (Some(score), Some(class_name)) = (
                detection.detection_scores.get(index),
                detection.detection_class_names.get(index),
            ) else {
                warn!("⚠️ 第 {} 个边界框缺少分数或类别，已丢弃", index);
                return None;
            };

            if raw.len() < 4 {
                warn!("⚠️ 第 {} 个边界框坐标不完整: {:?}", index, raw);
                return None;
            }

            let (x1, x2) = (raw[0].min(raw[2]), raw[0].max(raw[2]));
            let (y1, y2) = (raw[1].min(raw[3]), raw[1].max(raw[3]));

            Some((
                index,
                BoundingBox {
                    x1: x1 as i64,
                    y1: y1 as i64,
                    x2: x2 as i64,
                    y2: y2 as i64,
                    confidence: *score,
                    class_name: class_name.clone(),
                },
            ))
        })
        .collect();

    boxes.sort_by_key(|(_, bbox)| bbox.y1);

    let regions: Vec<Region> = boxes
        .into_iter()
        .enumerate()
        .map(|(rank, (detector_index, bbox))| Region {
            question_id: rank + 1,
            detector_index,
            bbox,
        })
        .collect();

    for region in &regions {
        let b = &region.bbox;
        info!(
            "[题目 {}] 坐标({},{},{},{}) 置信度:{:.3} 类别:{}",
            region.question_id, b.x1, b.y1, b.x2, b.y2, b.confidence, b.class_name
        );
    }
    info!("✓ 成功解析 {} 个题目区域，已按位置排序", regions.len());

    regions
}

/// 预先计算好的文本块：外接矩形 + 字符
struct PreparedSpan<'a> {
    span: &'a TextSpan,
    aabb: Option<Rect>,
    glyphs: Vec<CharGlyph>,
}

impl<'a> PreparedSpan<'a> {
    fn new(span: &'a TextSpan) -> Self {
        Self {
            span,
            aabb: span_aabb(span),
            glyphs: span.glyphs(),
        }
    }

    /// 该文本块对某个区域贡献的文本
    ///
    /// 有字符坐标时只取中心点落在区域内的字符，一个都没有就不贡献文本；
    /// 没有字符坐标时取整块文本。
    fn text_for(&self, region: &Rect) -> Option<String> {
        let aabb = self.aabb?;
        if !boxes_overlap(&aabb, region) {
            return None;
        }

        if self.glyphs.is_empty() {
            return Some(self.span.text.clone());
        }

        let precise: String = self
            .glyphs
            .iter()
            .filter(|g| center_in_region(&g.polygon, region))
            .map(|g| g.character)
            .collect();

        if precise.is_empty() {
            debug!(
                "文本块 '{}' 仅边缘接触区域，无字符落入",
                truncate_text(&self.span.text, 30)
            );
            return None;
        }

        if precise != self.span.text {
            debug!(
                "字符级精确提取: '{}' -> '{}'",
                truncate_text(&self.span.text, 30),
                precise
            );
        }
        Some(precise)
    }
}

/// 文本块外接矩形：优先用文本块四边形，残缺时用全部字符四边形的并集
fn span_aabb(span: &TextSpan) -> Option<Rect> {
    if let Some(aabb) = span.polygon.aabb() {
        return Some(aabb);
    }

    span.char_polygons
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|p| p.aabb())
        .reduce(|acc, r| acc.union(&r))
}

/// 把 OCR 文本和字符分配到每个题目区域
///
/// 返回 `question_id -> RegionContent`，每个区域都有一项（可能为空）。
/// 文本按 OCR 原始顺序用空格连接。
pub fn extract_regions(regions: &[Region], ocr: &OcrResponse) -> BTreeMap<usize, RegionContent> {
    let spans = ocr.spans();
    match &spans {
        OcrSpans::CharacterRich(s) => info!("使用 pages 格式（含字符级坐标），共 {} 个文本块", s.len()),
        OcrSpans::Coarse(s) => warn!("⚠️ 使用 detail 格式（缺少字符级坐标），共 {} 个文本块", s.len()),
        OcrSpans::Unrecognized => warn!("⚠️ OCR 结果中既没有 pages 也没有 detail"),
    }

    let prepared: Vec<PreparedSpan> = spans.spans().iter().map(PreparedSpan::new).collect();

    regions
        .iter()
        .map(|region| {
            let rect = region.rect();

            let texts: Vec<String> = prepared
                .iter()
                .filter_map(|p| p.text_for(&rect))
                .filter(|t| !t.is_empty())
                .collect();

            let characters: Vec<CharGlyph> = prepared
                .iter()
                .flat_map(|p| p.glyphs.iter())
                .filter(|g| center_in_region(&g.polygon, &rect))
                .cloned()
                .collect();

            let content = RegionContent {
                text: texts.join(" "),
                characters,
            };

            debug!(
                "[题目 {}] 区域文本 {} 字符，字符坐标 {} 个: {}",
                region.question_id,
                content.text.chars().count(),
                content.characters.len(),
                truncate_text(&content.text, 50)
            );

            (region.question_id, content)
        })
        .collect()
}
