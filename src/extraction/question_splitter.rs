//! 题目分割器
//!
//! 按题目区域裁剪整页图片，配上区域文本和字符，得到独立的 `Question`。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use tracing::{info, warn};

use crate::error::{AppResult, ImageError};
use crate::models::question::{Question, RegionContent};
use crate::models::region::Region;

/// 把带透明通道的图片合成到白色背景上
///
/// 没有透明通道时直接转换为 RGB。
pub fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let blend = |c: u8| (alpha * c as f32 + (1.0 - alpha) * 255.0).round() as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// 把区域坐标限制在图片范围内，宽高至少 1 像素
fn clamp_crop(region: &Region, width: u32, height: u32) -> (u32, u32, u32, u32) {
    let clamp = |v: i64, max: u32| v.clamp(0, max as i64) as u32;

    let x1 = clamp(region.bbox.x1, width.saturating_sub(1));
    let y1 = clamp(region.bbox.y1, height.saturating_sub(1));
    let x2 = clamp(region.bbox.x2, width).max(x1 + 1);
    let y2 = clamp(region.bbox.y2, height).max(y1 + 1);

    (x1, y1, x2 - x1, y2 - y1)
}

/// 按区域顺序生成题目（纯函数，不落盘）
///
/// 没有区域时返回空列表；区域文本为空的题目照常生成。
pub fn split_questions(
    page: &DynamicImage,
    page_stem: &str,
    regions: &[Region],
    contents: &BTreeMap<usize, RegionContent>,
) -> Vec<Question> {
    let (width, height) = page.dimensions();

    regions
        .iter()
        .map(|region| {
            let (x, y, w, h) = clamp_crop(region, width, height);
            let crop = page.crop_imm(x, y, w, h);
            let content = contents
                .get(&region.question_id)
                .cloned()
                .unwrap_or_default();

            Question {
                question_id: region.question_id,
                region: region.bbox.clone(),
                image: flatten_alpha(&crop),
                text: content.text,
                characters: content.characters,
                image_name: format!("{}_question_{}.jpg", page_stem, region.question_id),
            }
        })
        .collect()
}

/// 题目分割器：在 [`split_questions`] 基础上可选地把裁剪图片写入目录
pub struct QuestionSplitter {
    processed_folder: Option<PathBuf>,
}

impl QuestionSplitter {
    pub fn new(processed_folder: Option<PathBuf>) -> Self {
        Self { processed_folder }
    }

    pub fn split(
        &self,
        page: &DynamicImage,
        page_stem: &str,
        regions: &[Region],
        contents: &BTreeMap<usize, RegionContent>,
    ) -> Vec<Question> {
        let questions = split_questions(page, page_stem, regions, contents);

        if let Some(folder) = &self.processed_folder {
            for question in &questions {
                if let Err(e) = save_crop(folder, question) {
                    warn!("[题目 {}] ⚠️ 裁剪图片保存失败: {}", question.question_id, e);
                }
            }
        }

        info!("✓ 成功分割 {} 道题目", questions.len());
        questions
    }
}

fn save_crop(folder: &Path, question: &Question) -> AppResult<PathBuf> {
    let path = folder.join(&question.image_name);
    let bytes = question.to_jpeg()?;

    fs::create_dir_all(folder)
        .and_then(|_| fs::write(&path, bytes))
        .map_err(|source| ImageError::SaveFailed {
            path: path.display().to_string(),
            source,
        })?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::region::BoundingBox;
    use image::{Rgba, RgbaImage};

    fn region(question_id: usize, x1: i64, y1: i64, x2: i64, y2: i64) -> Region {
        Region {
            question_id,
            detector_index: question_id - 1,
            bbox: BoundingBox {
                x1,
                y1,
                x2,
                y2,
                confidence: 0.9,
                class_name: "question".to_string(),
            },
        }
    }

    #[test]
    fn test_flatten_alpha_onto_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 255]));

        let flat = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_half_transparent_pixel_blends() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 128]));

        let flat = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        let value = flat.get_pixel(0, 0).0[0];
        assert!((126..=128).contains(&value), "value = {}", value);
    }

    #[test]
    fn test_split_keeps_region_order_and_empty_text() {
        let page = DynamicImage::ImageRgb8(RgbImage::new(100, 120));
        let regions = vec![region(1, 0, 0, 100, 50), region(2, 0, 60, 100, 110)];
        let mut contents = BTreeMap::new();
        contents.insert(
            1,
            RegionContent {
                text: "1+1=2".to_string(),
                characters: Vec::new(),
            },
        );

        let questions = split_questions(&page, "page", &regions, &contents);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].text, "1+1=2");
        assert!(questions[1].text.is_empty());
        assert_eq!(questions[1].image.dimensions(), (100, 50));
        assert_eq!(questions[1].image_name, "page_question_2.jpg");
    }

    #[test]
    fn test_out_of_bounds_region_is_clamped() {
        let page = DynamicImage::ImageRgb8(RgbImage::new(50, 50));
        let regions = vec![region(1, -10, 40, 80, 200), region(2, 60, 60, 70, 70)];

        let questions = split_questions(&page, "p", &regions, &BTreeMap::new());
        assert_eq!(questions[0].image.dimensions(), (50, 10));
        assert_eq!(questions[1].image.dimensions(), (1, 1));
    }

    #[test]
    fn test_empty_page_yields_no_questions() {
        let page = DynamicImage::ImageRgb8(RgbImage::new(10, 10));
        assert!(split_questions(&page, "p", &[], &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_jpeg_encoding_and_save() {
        let page = DynamicImage::ImageRgba8(RgbaImage::new(20, 20));
        let questions = split_questions(&page, "demo", &[region(1, 0, 0, 10, 10)], &BTreeMap::new());
        let jpeg = questions[0].to_jpeg().unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let dir = std::env::temp_dir().join(format!("grader_split_{}", std::process::id()));
        let path = save_crop(&dir, &questions[0]).unwrap();
        assert!(path.ends_with("demo_question_1.jpg"));
        let _ = fs::remove_dir_all(&dir);
    }
}
