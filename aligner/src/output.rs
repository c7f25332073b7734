use std::{fs, io::Cursor, path::Path};

use image::{DynamicImage, ImageFormat};
use tracing::warn;

use crate::{config::Background, error::AlignError};

const OUTPUT_PREFIX: &str = "aligned_";

/// 对齐图片的输出文件名
///
/// 在原文件名前添加 `aligned_` 前缀, 透明背景强制使用 `.png` 扩展名
///
/// # 参数
///
/// * `filename` - 原文件名
/// * `background` - 背景
pub fn output_file_name(filename: &str, background: Background) -> String {
    let name = format!("{}{}", OUTPUT_PREFIX, filename);
    if background != Background::Transparent {
        return name;
    }
    match name.rsplit_once('.') {
        Some((stem, _)) => format!("{}.png", stem),
        None => format!("{}.png", name),
    }
}

/// 保存图片
///
/// 先在内存中完成编码, 编码成功后才写入文件; 写入失败时删除残留文件
///
/// # 参数
///
/// * `image` - 待保存的图片
/// * `path` - 保存路径, 格式由扩展名决定
pub fn write_image(image: &DynamicImage, path: &Path) -> Result<(), AlignError> {
    let write_error = |reason: String| AlignError::Write {
        path: path.to_path_buf(),
        reason,
    };
    let format = ImageFormat::from_path(path).map_err(|e| write_error(e.to_string()))?;
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, format)
        .map_err(|e| write_error(e.to_string()))?;

    if let Err(e) = fs::write(path, buffer.into_inner()) {
        if path.exists() {
            if let Err(remove) = fs::remove_file(path) {
                warn!("无法删除未写完的文件 {}: {}", path.display(), remove);
            }
        }
        return Err(write_error(e.to_string()));
    }
    Ok(())
}
