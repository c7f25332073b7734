use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// 目录中会被处理的图片扩展名
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "tiff"];

/// 是否为支持的图片扩展名 (忽略大小写)
fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// 展开输入路径
///
/// 目录展开为其中的图片文件 (按文件名排序), 文件原样保留, 不存在的路径会被跳过
///
/// # 参数
///
/// * `inputs` - 命令行中的图片或目录
pub fn collect_images(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = fs::read_dir(input)
                .with_context(|| format!("读取目录失败: {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_file() && is_image(path))
                .collect::<Vec<_>>();
            found.sort();
            debug!("目录 {} 中找到 {} 张图片", input.display(), found.len());
            images.extend(found);
        } else if input.exists() {
            images.push(input.clone());
        } else {
            warn!("图片路径不存在: {}", input.display());
        }
    }
    Ok(images)
}
