use anyhow::{Context, Result, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

//常用结构体

/// 尺寸
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    #[schemars(title = "宽度")]
    pub width: i32,
    #[schemars(title = "高度")]
    pub height: i32,
}

impl Size {
    /// 宽高是否均大于 0
    pub fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// 中心点 (向下取整)
    pub fn center(&self) -> Point {
        Point {
            x: self.width / 2,
            y: self.height / 2,
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// 从 `宽x高` 格式解析尺寸, 例如 `1920x1080`
impl FromStr for Size {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (width, height) = s
            .trim()
            .split_once(['x', 'X'])
            .with_context(|| format!("尺寸格式错误: {}, 应为 宽x高", s))?;
        let size = Size {
            width: str_to_number(width)?,
            height: str_to_number(height)?,
        };
        if !size.is_positive() {
            bail!("尺寸必须大于 0: {}", s);
        }
        Ok(size)
    }
}

/// 点坐标
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    #[schemars(title = "X 坐标")]
    pub x: i32,
    #[schemars(title = "Y 坐标")]
    pub y: i32,
}

/// 矩形区域
///
/// 左上角坐标为 (`x`, `y`)
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    #[schemars(title = "左上角 X 坐标")]
    pub x: i32,
    #[schemars(title = "左上角 Y 坐标")]
    pub y: i32,
    #[schemars(title = "宽度")]
    pub width: i32,
    #[schemars(title = "高度")]
    pub height: i32,
}

impl Rect {
    /// 中心点 (向下取整)
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2,
            y: self.y + self.height / 2,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// 点是否位于区域内 (右下边界不包含)
    ///
    /// # 参数
    ///
    /// * `point` - 点坐标
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
}

/// 字符串转数字
///
/// # 参数
///
/// - `s` - 字符串
pub fn str_to_number<T: FromStr>(s: &str) -> Result<T> {
    s.chars()
        .filter(|c| c.is_numeric() || c == &'.')
        .collect::<String>()
        .parse::<T>()
        .ok()
        .context("转换数字失败")
}

/// 获取路径中的文件名, 无法获取时返回完整路径
///
/// # 参数
///
/// - `path` - 文件路径
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
