use image::{GrayImage, RgbImage, imageops};
use imageproc::{
    contrast::{ThresholdType, otsu_level, threshold},
    filter::bilateral_filter,
};
use tracing::debug;

/// 双边滤波邻域直径
const BILATERAL_DIAMETER: u32 = 9;
/// 双边滤波颜色空间标准差
const SIGMA_COLOR: f32 = 75.0;
/// 双边滤波坐标空间标准差
const SIGMA_SPACE: f32 = 75.0;

/// 预处理图片以提升 OCR 识别率
///
/// 灰度化 -> 双边滤波 (保留边缘的平滑) -> Otsu 自动阈值二值化,
/// 大于阈值的像素置为 255, 其余置为 0
///
/// # 参数
///
/// * `image` - 原始图片
pub fn prepare_for_ocr(image: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(image);
    if gray.width() == 0 || gray.height() == 0 {
        return gray;
    }
    let smoothed = bilateral_filter(&gray, BILATERAL_DIAMETER, SIGMA_COLOR, SIGMA_SPACE);
    let level = otsu_level(&smoothed);
    debug!("Otsu 二值化阈值: {}", level);
    threshold(&smoothed, level, ThresholdType::Binary)
}
