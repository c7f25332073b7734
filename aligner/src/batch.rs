use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use common::file_name;
use ocr::Ocr;
use parking_lot::Mutex;
use tracing::{Dispatch, debug, error, info, warn};

use crate::{
    compositor::Compositor,
    config::AlignConfig,
    error::AlignError,
    locator::WordLocator,
    output::{output_file_name, write_image},
    progress::{ProgressEvent, ProgressSink},
};

/// 取消标记
///
/// 调用方与批处理共享, 批处理仅在图片边界以及 OCR 之后检查
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 批处理状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
    Cancelled,
    /// 批处理本身出错 (非单张图片失败)
    Failed(String),
}

/// 单张图片处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub success: bool,
    pub filename: String,
    /// 成功时为识别出的词, 失败时为失败原因
    pub detail: Option<String>,
}

impl BatchEntry {
    fn success(filename: String, detected: String) -> Self {
        Self {
            success: true,
            filename,
            detail: Some(detected),
        }
    }

    fn failure(filename: String, reason: String) -> Self {
        Self {
            success: false,
            filename,
            detail: Some(reason),
        }
    }
}

/// 批处理结果, 条目顺序与输入顺序一致
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub state: BatchState,
    pub entries: Vec<BatchEntry>,
}

impl BatchOutcome {
    /// 成功数量
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.success).count()
    }

    /// 失败数量
    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    /// 失败的文件名
    pub fn failed_files(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.success)
            .map(|e| e.filename.as_str())
            .collect()
    }
}

/// 单张图片处理结果
enum ItemOutcome {
    /// 已保存, 附带识别出的词
    Aligned(String),
    /// OCR 完成后检测到取消
    Cancelled,
}

/// 批处理器
///
/// 单线程顺序处理图片列表, 同一实例同一时间只运行一个批处理,
/// 其余调用阻塞等待.
pub struct BatchRunner {
    config: AlignConfig,
    locator: WordLocator,
    compositor: Compositor,
    progress: Option<Box<dyn ProgressSink>>,
    dispatch: Option<Dispatch>,
    cancelled: CancellationFlag,
    run_gate: Mutex<()>,
    state: Mutex<BatchState>,
}

impl BatchRunner {
    /// 创建批处理器
    ///
    /// # 参数
    ///
    /// * `config` - 对齐任务配置
    /// * `ocr` - 文字识别器
    pub fn new(config: AlignConfig, ocr: Arc<dyn Ocr>) -> Result<Self, AlignError> {
        config.validate()?;
        let locator = WordLocator::new(ocr, &config.target_word, config.match_mode);
        let compositor = Compositor::new(config.output_size, config.word_height, config.background);
        Ok(Self {
            config,
            locator,
            compositor,
            progress: None,
            dispatch: None,
            cancelled: CancellationFlag::default(),
            run_gate: Mutex::new(()),
            state: Mutex::new(BatchState::Idle),
        })
    }

    /// 设置进度回调
    ///
    /// # 参数
    ///
    /// * `callback` - 每张图片处理完成后调用
    pub fn with_progress<F>(self, callback: F) -> Self
    where
        F: Fn(&ProgressEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.with_progress_sink(callback)
    }

    /// 设置进度接收器
    ///
    /// # 参数
    ///
    /// * `sink` - 进度接收器
    pub fn with_progress_sink(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    /// 批处理期间使用指定的日志分发器, 而不是全局日志记录器
    ///
    /// # 参数
    ///
    /// * `dispatch` - 日志分发器
    pub fn with_log_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// 请求取消当前批处理
    pub fn cancel(&self) {
        self.cancelled.cancel();
        info!("已请求取消处理");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_cancelled()
    }

    /// 共享的取消标记, 可在其他线程或进度回调中取消
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancelled.clone()
    }

    /// 当前批处理状态
    pub fn state(&self) -> BatchState {
        self.state.lock().clone()
    }

    /// 处理图片列表
    ///
    /// 单张图片失败 (包括处理时 panic) 只记录到结果中, 批处理继续;
    /// 取消时未处理的图片不会出现在结果中.
    ///
    /// # 参数
    ///
    /// * `image_paths` - 图片路径列表
    /// * `output_dir` - 输出目录 (需已存在)
    pub fn process_images(&self, image_paths: &[PathBuf], output_dir: &Path) -> BatchOutcome {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, || {
                self.run_batch(image_paths, output_dir)
            }),
            None => self.run_batch(image_paths, output_dir),
        }
    }

    fn run_batch(&self, image_paths: &[PathBuf], output_dir: &Path) -> BatchOutcome {
        let _running = self.run_gate.lock();
        self.cancelled.reset();
        *self.state.lock() = BatchState::Running;

        if let Some(workers) = self.config.workers.filter(|w| *w > 1) {
            warn!("工作线程数 {} 不生效, 图片将按顺序逐张处理", workers);
        }
        info!(
            "开始处理 {} 张图片, 目标词: '{}'",
            image_paths.len(),
            self.config.target_word
        );

        let mut entries = Vec::with_capacity(image_paths.len());
        let state = self.run_items(image_paths, output_dir, &mut entries);

        let outcome = BatchOutcome { state, entries };
        match &outcome.state {
            BatchState::Failed(reason) => error!("批处理失败: {}", reason),
            BatchState::Cancelled => info!("处理已被取消"),
            _ => {}
        }
        info!(
            "处理完成! 成功对齐: {} 张, 失败: {} 张",
            outcome.succeeded(),
            outcome.failed()
        );

        *self.state.lock() = outcome.state.clone();
        outcome
    }

    /// 逐张处理图片, 返回批处理结束状态
    fn run_items(
        &self,
        image_paths: &[PathBuf],
        output_dir: &Path,
        entries: &mut Vec<BatchEntry>,
    ) -> BatchState {
        if !output_dir.is_dir() {
            return BatchState::Failed(format!("输出目录不存在: {}", output_dir.display()));
        }

        let total = image_paths.len();
        let pause = Duration::from_millis(self.config.item_pause_ms);
        let mut cancelled = false;

        for (index, path) in image_paths.iter().enumerate() {
            if self.cancelled.is_cancelled() {
                return BatchState::Cancelled;
            }

            let filename = file_name(path);
            let result = panic::catch_unwind(AssertUnwindSafe(|| self.process_item(path, output_dir)));
            let entry = match result {
                Ok(Ok(ItemOutcome::Aligned(detected))) => BatchEntry::success(filename.clone(), detected),
                Ok(Ok(ItemOutcome::Cancelled)) => {
                    cancelled = true;
                    BatchEntry::failure(filename.clone(), "处理已取消".to_string())
                }
                Ok(Err(e)) => {
                    match e {
                        AlignError::WordNotFound(_) => warn!("{}: {}", filename, e),
                        _ => error!("处理 {} 失败: {}", filename, e),
                    }
                    BatchEntry::failure(filename.clone(), e.to_string())
                }
                Err(payload) => {
                    let reason = format!("处理时发生异常: {}", panic_message(payload.as_ref()));
                    error!("{}: {}", filename, reason);
                    BatchEntry::failure(filename.clone(), reason)
                }
            };
            entries.push(entry);

            self.report_progress(&ProgressEvent {
                index: index + 1,
                total,
                operation: format!("处理 {}", filename),
                filename,
            });

            // 短暂暂停, 保证取消请求能及时生效
            thread::sleep(pause);
        }

        if cancelled {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        }
    }

    /// 处理单张图片: 定位目标词, 生成对齐图片并保存
    ///
    /// # 参数
    ///
    /// * `path` - 图片路径
    /// * `output_dir` - 输出目录
    fn process_item(&self, path: &Path, output_dir: &Path) -> Result<ItemOutcome, AlignError> {
        let Some(located) = self.locator.locate(path)? else {
            return Err(AlignError::WordNotFound(self.config.target_word.clone()));
        };

        if self.cancelled.is_cancelled() {
            return Ok(ItemOutcome::Cancelled);
        }

        let aligned = self.compositor.compose(&located.image, &located.word)?;
        let output_name = output_file_name(&file_name(path), self.config.background);
        write_image(&aligned, &output_dir.join(&output_name))?;

        info!(
            "已保存对齐图片: {} (识别为 '{}')",
            output_name, located.word.text
        );
        Ok(ItemOutcome::Aligned(located.word.text))
    }

    /// 调用进度回调, 回调出错或 panic 只记录日志
    fn report_progress(&self, event: &ProgressEvent) {
        debug!(
            "进度: {}/{} - {}",
            event.index, event.total, event.operation
        );
        let Some(sink) = &self.progress else {
            return;
        };
        match panic::catch_unwind(AssertUnwindSafe(|| sink.report(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("进度回调出错: {}", e),
            Err(payload) => error!("进度回调发生异常: {}", panic_message(payload.as_ref())),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知错误".to_string()
    }
}
