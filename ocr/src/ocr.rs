use anyhow::Result;
use image::GrayImage;

/// OCR 识别出的单个词
///
/// 坐标单位为像素, 置信度为识别引擎原生的 0-100 区间
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub text: String,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f32,
}

/// OCR 接口
pub trait Ocr: Send + Sync {
    /// 识别图片中的所有词及其位置
    ///
    /// # 参数
    ///
    /// * `image` - 预处理后的灰度图片
    fn recognize(&self, image: &GrayImage) -> Result<Vec<OcrToken>>;
}
