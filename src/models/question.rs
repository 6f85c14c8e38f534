//! OCR 文本与题目模型

use std::io::Cursor;

use crate::error::AppResult;
use crate::geometry::Polygon8;
use crate::models::region::BoundingBox;
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

/// OCR 识别出的一个文本块
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextSpan {
    pub text: String,
    pub polygon: Polygon8,
    /// 字符级坐标，仅在 OCR 返回字符明细时存在
    pub char_polygons: Option<Vec<Polygon8>>,
}

impl TextSpan {
    /// 把 `text[i]` 与 `char_polygons[i]` 配对成字符
    ///
    /// 字符数与坐标数不一致时只取前 `min` 个，其余丢弃。
    pub fn glyphs(&self) -> Vec<CharGlyph> {
        let Some(polygons) = &self.char_polygons else {
            return Vec::new();
        };

        self.text
            .chars()
            .zip(polygons.iter())
            .enumerate()
            .map(|(index, (character, polygon))| CharGlyph {
                character,
                polygon: polygon.clone(),
                index,
            })
            .collect()
    }

    pub fn has_characters(&self) -> bool {
        self.char_polygons.as_ref().is_some_and(|p| !p.is_empty())
    }
}

/// 单个字符及其四边形坐标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharGlyph {
    pub character: char,
    #[serde(rename = "coordinates")]
    pub polygon: Polygon8,
    /// 在所属文本块中的下标
    pub index: usize,
}

/// 区域提取结果：某道题的文本和字符
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionContent {
    pub text: String,
    pub characters: Vec<CharGlyph>,
}

/// 一道题：批改的最小工作单元
#[derive(Debug, Clone)]
pub struct Question {
    pub question_id: usize,
    pub region: BoundingBox,
    /// 裁剪后的题目图片（已去除透明通道）
    pub image: RgbImage,
    pub text: String,
    pub characters: Vec<CharGlyph>,
    /// 裁剪图片的文件名，如 `page_question_1.jpg`
    pub image_name: String,
}

impl Question {
    /// 编码为 JPEG，用于上传和落盘
    pub fn to_jpeg(&self) -> AppResult<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.image.write_to(&mut buffer, ImageFormat::Jpeg)?;
        Ok(buffer.into_inner())
    }

    /// 批改接口需要的字符坐标载荷（JSON 字符串），没有字符时为空串
    pub fn char_payload(&self) -> AppResult<String> {
        if self.characters.is_empty() {
            return Ok(String::new());
        }
        Ok(serde_json::to_string(&self.characters)?)
    }
}
