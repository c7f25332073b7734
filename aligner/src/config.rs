use std::{fmt, fs, path::Path};

use anyhow::{Context, Result};
use common::Size;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AlignError;

/// 匹配模式
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// 忽略大小写完全相等
    #[default]
    #[schemars(title = "完全匹配")]
    Exact,
    /// 识别词以目标词开头, 例如 "warp" 可匹配 "warpdotdev"
    #[schemars(title = "前缀匹配")]
    Prefix,
}

/// 输出画布背景
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    #[schemars(title = "白色")]
    White,
    #[schemars(title = "黑色")]
    Black,
    /// 原图主色调
    #[default]
    #[schemars(title = "主色调")]
    Dominant,
    /// 透明背景, 输出强制为 PNG
    #[schemars(title = "透明")]
    Transparent,
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Background::White => "white",
            Background::Black => "black",
            Background::Dominant => "dominant",
            Background::Transparent => "transparent",
        };
        f.write_str(name)
    }
}

fn default_output_size() -> Size {
    Size {
        width: 1920,
        height: 1080,
    }
}

fn default_word_height() -> u32 {
    100
}

fn default_item_pause_ms() -> u64 {
    10
}

/// 对齐任务配置
#[derive(JsonSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AlignConfig {
    #[schemars(title = "目标词")]
    pub target_word: String,
    #[schemars(title = "输出图片尺寸")]
    #[serde(default = "default_output_size")]
    pub output_size: Size,
    #[schemars(title = "目标词在输出图片中的像素高度")]
    #[serde(default = "default_word_height")]
    pub word_height: u32,
    #[schemars(title = "匹配模式")]
    #[serde(default)]
    pub match_mode: MatchMode,
    #[schemars(title = "背景")]
    #[serde(default)]
    pub background: Background,
    /// 仅为兼容调用方保留, 处理始终为单线程顺序执行
    #[schemars(title = "工作线程数 (不生效)")]
    #[serde(default)]
    pub workers: Option<usize>,
    #[schemars(title = "每张图片处理后的暂停时长 (单位: 毫秒)")]
    #[serde(default = "default_item_pause_ms")]
    pub item_pause_ms: u64,
}

impl AlignConfig {
    /// 使用默认参数创建配置
    ///
    /// # 参数
    ///
    /// * `target_word` - 目标词
    pub fn new(target_word: impl Into<String>) -> Self {
        Self {
            target_word: target_word.into(),
            output_size: default_output_size(),
            word_height: default_word_height(),
            match_mode: MatchMode::default(),
            background: Background::default(),
            workers: None,
            item_pause_ms: default_item_pause_ms(),
        }
    }

    /// 通过 YAML 文件加载配置
    ///
    /// # 参数
    ///
    /// * `config_file` - 配置文件路径
    pub fn load(config_file: &Path) -> Result<Self> {
        let data = fs::read(config_file)
            .with_context(|| format!("读取配置文件失败: {}", config_file.display()))?;
        let config = serde_yaml::from_slice::<AlignConfig>(data.as_slice())
            .context("解析配置文件失败, 请检查格式是否正确")?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), AlignError> {
        if self.target_word.trim().is_empty() {
            return Err(AlignError::InvalidConfig("目标词不能为空".to_string()));
        }
        if !self.output_size.is_positive() {
            return Err(AlignError::InvalidConfig(format!(
                "输出尺寸必须大于 0: {}",
                self.output_size
            )));
        }
        if self.word_height == 0 {
            return Err(AlignError::InvalidConfig("目标词高度必须大于 0".to_string()));
        }
        Ok(())
    }
}
