use std::{path::PathBuf, process::Command};

use anyhow::Result;
use image::{GrayImage, ImageFormat};
use thiserror::Error;
use tracing::debug;

use crate::ocr::{Ocr, OcrToken};

/// TSV 中 "词" 级别的行
const WORD_LEVEL: i32 = 5;

/// TSV 固定列数 (最后一列为文本, 可能为空)
const TSV_COLUMNS: usize = 12;

#[derive(Error, Debug)]
pub enum TesseractError {
    #[error("无法启动 tesseract ({program}): {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tesseract 执行失败 ({status}): {stderr}")]
    Exit { status: String, stderr: String },
    #[error("TSV 第 {line} 行格式错误: {reason}")]
    Tsv { line: usize, reason: String },
}

/// Tesseract 参数
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// 可执行文件路径
    pub program: PathBuf,
    /// 识别语言
    pub language: String,
    /// 页面分割模式
    pub page_segmentation_mode: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            page_segmentation_mode: 3,
        }
    }
}

/// 基于 Tesseract 命令行的 OCR 实现
pub struct Tesseract {
    config: OcrConfig,
}

impl Tesseract {
    /// 创建 Tesseract 实例
    ///
    /// # 参数
    ///
    /// * `config` - Tesseract 参数
    pub fn new(config: OcrConfig) -> Self {
        debug!("Tesseract 参数: {:?}", config);
        Self { config }
    }

    /// 检查 tesseract 是否可用, 返回版本信息首行
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.config.program)
            .arg("--version")
            .output()
            .map_err(|source| TesseractError::Spawn {
                program: self.config.program.display().to_string(),
                source,
            })?;
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }
}

impl Ocr for Tesseract {
    /// 将图片写入临时文件后调用 tesseract, 解析 TSV 输出
    ///
    /// # 参数
    ///
    /// * `image` - 预处理后的灰度图片
    fn recognize(&self, image: &GrayImage) -> Result<Vec<OcrToken>> {
        let input = tempfile::Builder::new()
            .prefix("quickcuts-ocr-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(input.path(), ImageFormat::Png)?;

        let output = Command::new(&self.config.program)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language)
            .arg("--psm")
            .arg(self.config.page_segmentation_mode.to_string())
            .arg("tsv")
            .output()
            .map_err(|source| TesseractError::Spawn {
                program: self.config.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(TesseractError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let tokens = parse_tsv(&String::from_utf8_lossy(&output.stdout))?;
        debug!("tesseract 识别到 {} 个词", tokens.len());
        Ok(tokens)
    }
}

/// 解析 tesseract 的 TSV 输出
///
/// 仅保留词级别的行. 列依次为:
/// level page_num block_num par_num line_num word_num left top width height conf text
///
/// # 参数
///
/// * `tsv` - TSV 文本
pub fn parse_tsv(tsv: &str) -> Result<Vec<OcrToken>, TesseractError> {
    let mut tokens = Vec::new();

    for (index, line) in tsv.lines().enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() || line.starts_with("level") {
            continue;
        }

        let columns: Vec<&str> = line.splitn(TSV_COLUMNS, '\t').collect();
        if columns.len() < TSV_COLUMNS - 1 {
            return Err(TesseractError::Tsv {
                line: line_number,
                reason: format!("列数不足: {}", columns.len()),
            });
        }

        let int_column = |i: usize| -> Result<i32, TesseractError> {
            columns[i].trim().parse().map_err(|_| TesseractError::Tsv {
                line: line_number,
                reason: format!("第 {} 列不是整数: {}", i + 1, columns[i]),
            })
        };

        if int_column(0)? != WORD_LEVEL {
            continue;
        }

        let confidence = columns[10]
            .trim()
            .parse::<f32>()
            .map_err(|_| TesseractError::Tsv {
                line: line_number,
                reason: format!("置信度格式错误: {}", columns[10]),
            })?;

        tokens.push(OcrToken {
            text: columns.get(11).map(|t| t.trim()).unwrap_or_default().to_string(),
            left: int_column(6)?,
            top: int_column(7)?,
            width: int_column(8)?,
            height: int_column(9)?,
            confidence,
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t
4\t1\t1\t1\t1\t0\t36\t92\t250\t40\t-1\t
5\t1\t1\t1\t1\t1\t36\t92\t120\t40\t96.063751\tWarp
5\t1\t1\t1\t1\t2\t170\t94\t116\t38\t88.5\tterminal
5\t1\t1\t1\t1\t3\t300\t94\t10\t38\t12\t
";

    #[test]
    fn test_parse_tsv_words_only() -> Result<()> {
        let tokens = parse_tsv(SAMPLE)?;
        assert_eq!(tokens.len(), 3);
        assert_eq!(
            tokens[0],
            OcrToken {
                text: "Warp".to_string(),
                left: 36,
                top: 92,
                width: 120,
                height: 40,
                confidence: 96.063751,
            }
        );
        assert_eq!(tokens[1].text, "terminal");
        assert_eq!(tokens[2].text, "");
        Ok(())
    }

    #[test]
    fn test_parse_tsv_empty() -> Result<()> {
        assert!(parse_tsv("")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_tsv_malformed() {
        let result = parse_tsv("5\t1\t1\tabc");
        assert!(matches!(result, Err(TesseractError::Tsv { line: 1, .. })));

        let result = parse_tsv("5\t1\t1\t1\t1\t1\tx\t92\t120\t40\t96\tWarp");
        assert!(matches!(result, Err(TesseractError::Tsv { .. })));
    }

    #[test]
    fn test_missing_program() {
        let tesseract = Tesseract::new(OcrConfig {
            program: PathBuf::from("/nonexistent/tesseract-binary"),
            ..OcrConfig::default()
        });
        let image = GrayImage::new(4, 4);
        assert!(tesseract.recognize(&image).is_err());
    }
}
