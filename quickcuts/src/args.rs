use std::path::PathBuf;

use aligner::{Background, MatchMode};
use clap::{Parser, ValueEnum};
use common::Size;
use tracing::Level;

/// 背景选项
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundArg {
    White,
    Black,
    /// 原图主色调
    Dominant,
    /// 透明背景, 输出强制为 PNG
    Transparent,
}

impl From<BackgroundArg> for Background {
    fn from(value: BackgroundArg) -> Self {
        match value {
            BackgroundArg::White => Background::White,
            BackgroundArg::Black => Background::Black,
            BackgroundArg::Dominant => Background::Dominant,
            BackgroundArg::Transparent => Background::Transparent,
        }
    }
}

/// Quick Cuts: 识别图片中的目标词, 缩放并居中输出为统一尺寸的图片
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// 输入图片或目录
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// 需要居中的目标词
    #[arg(short, long, required_unless_present = "config")]
    pub word: Option<String>,

    /// YAML 配置文件, 提供后忽略其余对齐参数
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输出目录 (默认: ./aligned_<目标词>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 输出图片尺寸
    #[arg(short, long, default_value = "1920x1080")]
    pub size: Size,

    /// 目标词在输出图片中的像素高度
    #[arg(long, default_value_t = 100)]
    pub word_height: u32,

    /// 背景
    #[arg(long, value_enum, default_value_t = BackgroundArg::Dominant)]
    pub background: BackgroundArg,

    /// 启用前缀匹配 (例如 "warp" 可匹配 "warpdotdev")
    #[arg(long, default_value_t = false)]
    pub partial: bool,

    /// 工作线程数 (不生效, 图片始终按顺序处理)
    #[arg(long)]
    pub workers: Option<usize>,

    /// tesseract 可执行文件路径
    #[arg(long, default_value = "tesseract")]
    pub tesseract: PathBuf,

    /// OCR 识别语言
    #[arg(long, default_value = "eng")]
    pub language: String,

    /// 日志等级 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: Option<Level>,

    /// 日志文件路径
    #[arg(long, default_value = "quickcuts.log")]
    pub log_file: String,

    /// 追加日志到文件
    #[arg(long, default_value_t = false)]
    pub append_log: bool,
}

impl Args {
    /// 创建命令行参数解析器
    pub fn new() -> Self {
        Self::parse()
    }

    /// 匹配模式
    pub fn match_mode(&self) -> MatchMode {
        if self.partial {
            MatchMode::Prefix
        } else {
            MatchMode::Exact
        }
    }
}
