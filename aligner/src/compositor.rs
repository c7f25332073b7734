use common::{Point, Rect, Size};
use image::{
    DynamicImage, GenericImage, Rgb, RgbImage, Rgba, RgbaImage,
    imageops::{self, FilterType},
};
use tracing::debug;

use crate::{color::dominant_color, config::Background, error::AlignError, locator::WordMatch};

/// 缩放后图片的最大像素数, 超出视为目标词过小无法处理
const MAX_RESIZED_PIXELS: u64 = 1 << 28;

/// 粘贴区域
///
/// 从缩放后图片的 `source` 区域复制到画布的 `destination` 位置, 两者尺寸相同
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasteRegion {
    pub source: Rect,
    pub destination: Point,
}

/// 计算使目标词中心与画布中心重合的粘贴区域
///
/// 源区域与目标区域均被限制在各自图片范围内, 复制宽高不大于 0 时返回 `None`
///
/// # 参数
///
/// * `resized` - 缩放后图片尺寸
/// * `word_center` - 缩放后目标词中心
/// * `canvas` - 画布尺寸
pub fn paste_region(resized: Size, word_center: Point, canvas: Size) -> Option<PasteRegion> {
    let canvas_center = canvas.center();

    let src_left = (word_center.x - canvas_center.x).max(0);
    let src_top = (word_center.y - canvas_center.y).max(0);
    let src_right = (word_center.x + canvas_center.x).min(resized.width);
    let src_bottom = (word_center.y + canvas_center.y).min(resized.height);

    let dst_left = (canvas_center.x - word_center.x).max(0);
    let dst_top = (canvas_center.y - word_center.y).max(0);

    let copy_width = (src_right - src_left).min(canvas.width - dst_left);
    let copy_height = (src_bottom - src_top).min(canvas.height - dst_top);

    if copy_width <= 0 || copy_height <= 0 {
        return None;
    }

    Some(PasteRegion {
        source: Rect {
            x: src_left,
            y: src_top,
            width: copy_width,
            height: copy_height,
        },
        destination: Point {
            x: dst_left,
            y: dst_top,
        },
    })
}

/// 对齐图片生成器
///
/// 将原图整体缩放到目标词高度, 再粘贴到固定尺寸画布上, 使目标词位于画布中心
pub struct Compositor {
    output_size: Size,
    word_height: u32,
    background: Background,
}

impl Compositor {
    /// 创建对齐图片生成器
    ///
    /// # 参数
    ///
    /// * `output_size` - 输出画布尺寸
    /// * `word_height` - 目标词在画布中的像素高度
    /// * `background` - 背景
    pub fn new(output_size: Size, word_height: u32, background: Background) -> Self {
        Self {
            output_size,
            word_height,
            background,
        }
    }

    /// 缩放比例, 目标词高度为 0 时不缩放
    ///
    /// # 参数
    ///
    /// * `word_height` - 原图中目标词高度
    pub fn scale(&self, word_height: i32) -> f64 {
        if word_height > 0 {
            self.word_height as f64 / word_height as f64
        } else {
            1.0
        }
    }

    /// 生成对齐图片
    ///
    /// 透明背景输出 RGBA 图片, 其余输出 RGB 图片
    ///
    /// # 参数
    ///
    /// * `source` - 原图
    /// * `word` - 目标词识别结果
    pub fn compose(&self, source: &RgbImage, word: &WordMatch) -> Result<DynamicImage, AlignError> {
        if !self.output_size.is_positive() {
            return Err(AlignError::Composition(format!(
                "输出尺寸无效: {}",
                self.output_size
            )));
        }

        let scale = self.scale(word.rect.height);
        let (width, height) = source.dimensions();
        let resized_width = (width as f64 * scale) as u32;
        let resized_height = (height as f64 * scale) as u32;
        if resized_width as u64 * resized_height as u64 > MAX_RESIZED_PIXELS {
            return Err(AlignError::Composition(format!(
                "缩放后图片过大: {}x{} (缩放比例 {:.3})",
                resized_width, resized_height, scale
            )));
        }

        let center = word.center();
        let word_center = Point {
            x: (center.x as f64 * scale) as i32,
            y: (center.y as f64 * scale) as i32,
        };
        debug!(
            "缩放比例: {:.3}, 缩放后尺寸: {}x{}, 目标词中心: {:?}",
            scale, resized_width, resized_height, word_center
        );

        let region = paste_region(
            Size {
                width: resized_width as i32,
                height: resized_height as i32,
            },
            word_center,
            self.output_size,
        );

        let canvas_width = self.output_size.width as u32;
        let canvas_height = self.output_size.height as u32;

        let Some(region) = region else {
            debug!("粘贴区域为空, 输出纯背景画布");
            return Ok(self.blank_canvas(source, canvas_width, canvas_height));
        };

        let resized = imageops::resize(source, resized_width, resized_height, FilterType::CatmullRom);
        let patch = imageops::crop_imm(
            &resized,
            region.source.x as u32,
            region.source.y as u32,
            region.source.width as u32,
            region.source.height as u32,
        )
        .to_image();
        debug!("粘贴区域: {:?}", region);

        let mut canvas = self.blank_canvas(source, canvas_width, canvas_height);
        let (dst_x, dst_y) = (region.destination.x as u32, region.destination.y as u32);
        let pasted = match &mut canvas {
            // 透明背景仅粘贴区域不透明
            DynamicImage::ImageRgba8(canvas) => {
                let patch = DynamicImage::ImageRgb8(patch).to_rgba8();
                canvas.copy_from(&patch, dst_x, dst_y)
            }
            DynamicImage::ImageRgb8(canvas) => canvas.copy_from(&patch, dst_x, dst_y),
            _ => unreachable!("画布仅为 RGB 或 RGBA"),
        };
        pasted.map_err(|e| AlignError::Composition(e.to_string()))?;

        Ok(canvas)
    }

    /// 创建纯背景画布
    fn blank_canvas(&self, source: &RgbImage, width: u32, height: u32) -> DynamicImage {
        match self.background {
            Background::White => {
                DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
            }
            Background::Black => DynamicImage::ImageRgb8(RgbImage::new(width, height)),
            Background::Dominant => {
                DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, dominant_color(source)))
            }
            Background::Transparent => {
                DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0])))
            }
        }
    }
}
