use anyhow::Result;

/// 进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 当前图片序号, 从 1 开始
    pub index: usize,
    pub total: usize,
    pub filename: String,
    /// 当前操作描述
    pub operation: String,
}

/// 进度接收器
///
/// 在批处理线程中同步调用, 返回的错误只会被记录, 不会中断批处理
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: &ProgressEvent) -> Result<()>;
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) -> Result<()> + Send + Sync,
{
    fn report(&self, event: &ProgressEvent) -> Result<()> {
        self(event)
    }
}
