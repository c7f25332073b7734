use std::{fs, path::Path, sync::Arc};

use common::{Point, Rect};
use image::RgbImage;
use ocr::{Ocr, OcrToken, prepare_for_ocr};
use tracing::debug;

use crate::{config::MatchMode, error::AlignError};

/// 最低置信度, 低于等于该值的识别结果会被忽略
pub const MIN_CONFIDENCE: f32 = 30.0;

/// 目标词的识别结果
#[derive(Debug, Clone, PartialEq)]
pub struct WordMatch {
    /// 词所在区域, 前缀匹配时宽度按字符比例估算
    pub rect: Rect,
    pub confidence: f32,
    /// OCR 识别出的原始文本
    pub text: String,
}

impl WordMatch {
    /// 区域中心点 (向下取整)
    pub fn center(&self) -> Point {
        self.rect.center()
    }
}

/// 已找到目标词的图片
pub struct LocatedWord {
    pub image: RgbImage,
    pub word: WordMatch,
}

/// 读取图片
///
/// 优先读取文件字节后在内存中解码, 以兼容特殊字符路径, 失败后再按路径直接解码
///
/// # 参数
///
/// * `path` - 图片路径
pub fn load_image(path: &Path) -> Result<RgbImage, AlignError> {
    let image = match fs::read(path).map(|bytes| image::load_from_memory(&bytes)) {
        Ok(Ok(image)) => image,
        _ => {
            debug!("内存解码失败, 尝试按路径解码: {}", path.display());
            image::open(path).map_err(|source| AlignError::ImageDecode {
                path: path.to_path_buf(),
                source,
            })?
        }
    };
    Ok(image.to_rgb8())
}

/// 目标词定位器
pub struct WordLocator {
    ocr: Arc<dyn Ocr>,
    target_word: String,
    match_mode: MatchMode,
}

impl WordLocator {
    /// 创建目标词定位器
    ///
    /// # 参数
    ///
    /// * `ocr` - 文字识别器
    /// * `target_word` - 目标词, 比较时忽略大小写
    /// * `match_mode` - 匹配模式
    pub fn new(ocr: Arc<dyn Ocr>, target_word: &str, match_mode: MatchMode) -> Self {
        Self {
            ocr,
            target_word: target_word.to_lowercase(),
            match_mode,
        }
    }

    /// 读取图片并查找目标词
    ///
    /// # 参数
    ///
    /// * `path` - 图片路径
    pub fn locate(&self, path: &Path) -> Result<Option<LocatedWord>, AlignError> {
        let image = load_image(path)?;
        let word = self.find_word(&image)?;
        Ok(word.map(|word| LocatedWord { image, word }))
    }

    /// 在图片中查找目标词
    ///
    /// # 参数
    ///
    /// * `image` - 原始图片
    pub fn find_word(&self, image: &RgbImage) -> Result<Option<WordMatch>, AlignError> {
        let prepared = prepare_for_ocr(image);
        let tokens = self.ocr.recognize(&prepared).map_err(AlignError::Ocr)?;
        Ok(self.best_match(&tokens))
    }

    /// 识别词是否与目标词匹配
    fn is_match(&self, text: &str) -> bool {
        match self.match_mode {
            MatchMode::Exact => text == self.target_word,
            MatchMode::Prefix => text.starts_with(&self.target_word),
        }
    }

    /// 从识别结果中选出置信度最高的匹配项
    ///
    /// 置信度相同时保留最先出现的词
    ///
    /// # 参数
    ///
    /// * `tokens` - OCR 识别结果
    pub fn best_match(&self, tokens: &[OcrToken]) -> Option<WordMatch> {
        let mut best: Option<WordMatch> = None;
        let mut highest = 0.0;

        for token in tokens {
            let text = token.text.to_lowercase();
            if !self.is_match(&text) {
                continue;
            }
            if !(token.confidence > highest && token.confidence > MIN_CONFIDENCE) {
                continue;
            }

            let mut width = token.width.max(0);
            if self.match_mode == MatchMode::Prefix && text != self.target_word {
                // 按字符数比例估算目标词宽度
                let proportion =
                    self.target_word.chars().count() as f64 / text.chars().count() as f64;
                width = (width as f64 * proportion) as i32;
            }

            debug!(
                "匹配到: {}, 置信度: {}, 位置: ({}, {})",
                token.text, token.confidence, token.left, token.top
            );
            best = Some(WordMatch {
                rect: Rect {
                    x: token.left,
                    y: token.top,
                    width,
                    height: token.height.max(0),
                },
                confidence: token.confidence,
                text: token.text.clone(),
            });
            highest = token.confidence;
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Result, anyhow};
    use image::{GrayImage, Rgb};

    use super::*;

    struct FixedOcr(Vec<OcrToken>);

    impl Ocr for FixedOcr {
        fn recognize(&self, _image: &GrayImage) -> Result<Vec<OcrToken>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenOcr;

    impl Ocr for BrokenOcr {
        fn recognize(&self, _image: &GrayImage) -> Result<Vec<OcrToken>> {
            Err(anyhow!("引擎不可用"))
        }
    }

    fn token(text: &str, confidence: f32) -> OcrToken {
        OcrToken {
            text: text.to_string(),
            left: 10,
            top: 20,
            width: 100,
            height: 30,
            confidence,
        }
    }

    fn locator(tokens: Vec<OcrToken>, word: &str, mode: MatchMode) -> WordLocator {
        WordLocator::new(Arc::new(FixedOcr(tokens)), word, mode)
    }

    #[test]
    fn test_exact_match_ignores_case() {
        let locator = locator(vec![], "Warp", MatchMode::Exact);
        let found = locator.best_match(&[token("hello", 90.0), token("WARP", 80.0)]);
        let found = found.expect("应匹配到目标词");
        assert_eq!(found.text, "WARP");
        assert_eq!(found.rect.width, 100);
        assert_eq!(found.center(), Point { x: 60, y: 35 });
    }

    #[test]
    fn test_exact_match_rejects_prefix() {
        let locator = locator(vec![], "warp", MatchMode::Exact);
        assert!(locator.best_match(&[token("warpdotdev", 90.0)]).is_none());
    }

    #[test]
    fn test_confidence_floor() {
        let locator = locator(vec![], "warp", MatchMode::Exact);
        assert!(locator.best_match(&[token("warp", 30.0)]).is_none());
        assert!(locator.best_match(&[token("warp", -1.0)]).is_none());
        assert!(locator.best_match(&[token("warp", 30.5)]).is_some());
    }

    #[test]
    fn test_nan_confidence_is_ignored() {
        let locator = locator(vec![], "warp", MatchMode::Exact);
        assert!(locator.best_match(&[token("warp", f32::NAN)]).is_none());

        let mut valid = token("warp", 60.0);
        valid.left = 7;
        let found = locator.best_match(&[token("warp", f32::NAN), valid]).unwrap();
        assert_eq!(found.rect.x, 7);
        assert_eq!(found.confidence, 60.0);
    }

    #[test]
    fn test_highest_confidence_wins_and_ties_keep_first() {
        let locator = locator(vec![], "warp", MatchMode::Exact);
        let mut first = token("warp", 70.0);
        first.left = 1;
        let mut second = token("Warp", 70.0);
        second.left = 2;
        let mut third = token("warp", 50.0);
        third.left = 3;

        let found = locator.best_match(&[third.clone(), first, second]).unwrap();
        assert_eq!(found.rect.x, 1);

        let mut best = token("warp", 95.0);
        best.left = 4;
        let found = locator.best_match(&[third, best]).unwrap();
        assert_eq!(found.rect.x, 4);
    }

    #[test]
    fn test_prefix_match_estimates_width() {
        let locator = locator(vec![], "warp", MatchMode::Prefix);
        let mut long = token("warpdotdev", 90.0);
        long.width = 97;
        let found = locator.best_match(&[long]).unwrap();
        // floor(97 * 4 / 10)
        assert_eq!(found.rect.width, 38);
        assert_eq!(found.rect.height, 30);
        assert_eq!(found.text, "warpdotdev");
    }

    #[test]
    fn test_prefix_match_exact_token_keeps_width() {
        let locator = locator(vec![], "warp", MatchMode::Prefix);
        let found = locator.best_match(&[token("Warp", 90.0)]).unwrap();
        assert_eq!(found.rect.width, 100);
        assert!(locator.best_match(&[token("dotwarp", 90.0)]).is_none());
    }

    #[test]
    fn test_locate_reads_image() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sample.png");
        RgbImage::from_pixel(40, 20, Rgb([200, 200, 200])).save(&path)?;

        let locator = locator(vec![token("warp", 88.0)], "warp", MatchMode::Exact);
        let located = locator.locate(&path)?.expect("应匹配到目标词");
        assert_eq!(located.image.dimensions(), (40, 20));
        assert_eq!(located.word.confidence, 88.0);

        let locator = locator_without_match();
        assert!(locator.locate(&path)?.is_none());
        Ok(())
    }

    fn locator_without_match() -> WordLocator {
        locator(vec![token("other", 99.0)], "warp", MatchMode::Exact)
    }

    #[test]
    fn test_locate_undecodable_image() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"not an image")?;

        let result = locator(vec![], "warp", MatchMode::Exact).locate(&path);
        assert!(matches!(result, Err(AlignError::ImageDecode { .. })));

        let missing = dir.path().join("missing.png");
        let result = locator(vec![], "warp", MatchMode::Exact).locate(&missing);
        assert!(matches!(result, Err(AlignError::ImageDecode { .. })));
        Ok(())
    }

    #[test]
    fn test_locate_ocr_failure() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sample.png");
        RgbImage::new(8, 8).save(&path)?;

        let locator = WordLocator::new(Arc::new(BrokenOcr), "warp", MatchMode::Exact);
        assert!(matches!(locator.locate(&path), Err(AlignError::Ocr(_))));
        Ok(())
    }
}
