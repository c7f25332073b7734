use std::{fs, path::PathBuf, sync::Arc};

use aligner::{AlignConfig, BatchRunner, BatchState, ProgressEvent};
use anyhow::{Context, Result, bail};
use ocr::{OcrConfig, Tesseract};
use tracing::{error, info, warn};

use crate::{args::Args, input::collect_images, log::init_log};

mod args;
mod input;
mod log;

/// 根据命令行参数生成对齐配置
///
/// # 参数
///
/// * `args` - 命令行参数
fn align_config(args: &Args) -> Result<AlignConfig> {
    if let Some(config_file) = &args.config {
        return AlignConfig::load(config_file);
    }
    let word = args.word.clone().context("缺少目标词")?;
    let config = AlignConfig {
        output_size: args.size,
        word_height: args.word_height,
        match_mode: args.match_mode(),
        background: args.background.into(),
        workers: args.workers,
        ..AlignConfig::new(word)
    };
    config.validate()?;
    Ok(config)
}

/// 程序入口
fn application() -> Result<()> {
    let args = Args::new();

    init_log(&args)?;

    let config = align_config(&args)?;

    let images = collect_images(&args.images)?;
    if images.is_empty() {
        bail!("没有找到图片文件");
    }
    info!("找到 {} 张待处理图片", images.len());

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("./aligned_{}", config.target_word)));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("创建输出目录失败: {}", output_dir.display()))?;

    let tesseract = Tesseract::new(OcrConfig {
        program: args.tesseract.clone(),
        language: args.language.clone(),
        ..OcrConfig::default()
    });
    match tesseract.version() {
        Ok(version) => info!("OCR 引擎: {}", version),
        Err(e) => warn!("无法获取 tesseract 版本: {}", e),
    }

    let runner = BatchRunner::new(config, Arc::new(tesseract))?.with_progress(
        |event: &ProgressEvent| {
            info!(
                "进度: {}/{} - {}",
                event.index, event.total, event.filename
            );
            Ok(())
        },
    );

    let outcome = runner.process_images(&images, &output_dir);

    info!("成功对齐: {} 张图片", outcome.succeeded());
    let failed = outcome.failed_files();
    if !failed.is_empty() {
        info!("处理失败: {}", failed.join(", "));
    }
    if let BatchState::Failed(reason) = outcome.state {
        bail!(reason);
    }
    info!("对齐图片已保存到: {}", output_dir.display());
    Ok(())
}

fn main() {
    if let Err(e) = application() {
        error!("程序存在异常: {}", e);
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
