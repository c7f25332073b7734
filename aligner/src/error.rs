use std::path::PathBuf;

use thiserror::Error;

/// 单张图片处理错误
///
/// 均在图片边界被捕获并记录为失败结果, 不会中断批处理
#[derive(Error, Debug)]
pub enum AlignError {
    #[error("无法读取图片 {}: {source}", path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("未找到目标词 '{0}'")]
    WordNotFound(String),
    #[error("OCR 识别失败: {0}")]
    Ocr(anyhow::Error),
    #[error("生成对齐图片失败: {0}")]
    Composition(String),
    #[error("保存图片失败 {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
    #[error("配置错误: {0}")]
    InvalidConfig(String),
}
