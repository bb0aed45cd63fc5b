//! 限速器与分批变更执行器
//!
//! 外部订阅/合同接口有调用频率限制且不保证幂等，批量变更必须控制节奏：
//! - `Throttle`: 保证相邻两次调用的**启动**时间间隔不小于配置值
//! - `run_batched`: 将请求按固定大小切批，批内并发提交、经同一个限速闸门串行启动，
//!   整批全部结束后才开始下一批
//!
//! 并发提交的调用争抢闸门时不保证先来先服务：每个调用各自休眠后重新检查，
//! 谁先醒来谁先通过。调用方不能依赖批内的完成顺序。

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Throttle: 启动间隔限速
// ---------------------------------------------------------------------------

/// 启动间隔限速闸门
///
/// 每个实例维护一个"上次启动时间"。锁只在检查/登记时短暂持有，不跨越 await。
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: Mutex::new(None),
        }
    }

    /// 等待直到允许启动，并登记本次启动时间
    ///
    /// 距上次启动已满间隔则立即登记返回；否则休眠剩余时间后重新检查。
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut last_start = self.last_start.lock();
                let now = Instant::now();
                match *last_start {
                    Some(prev) if now.duration_since(prev) < self.interval => {
                        self.interval - now.duration_since(prev)
                    }
                    _ => {
                        *last_start = Some(now);
                        return;
                    }
                }
            };

            tokio::time::sleep(wait).await;
        }
    }

    /// 经过闸门后执行一次操作
    pub async fn run<F, Fut>(&self, op: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        self.acquire().await;
        op().await
    }
}

/// 绑定了限速闸门的操作
///
/// 同一个 `Throttled` 的所有调用共享一个闸门。
pub struct Throttled<F> {
    op: F,
    gate: Throttle,
}

impl<F> Throttled<F> {
    pub fn new(op: F, interval: Duration) -> Self {
        Self {
            op,
            gate: Throttle::new(interval),
        }
    }

    /// 经过闸门后以 `arg` 调用被包装的操作
    pub async fn call<T, Fut>(&self, arg: T) -> Fut::Output
    where
        F: Fn(T) -> Fut,
        Fut: Future,
    {
        self.gate.acquire().await;
        (self.op)(arg).await
    }
}

/// 用限速闸门包装一个操作
pub fn throttle<F>(op: F, interval: Duration) -> Throttled<F> {
    Throttled::new(op, interval)
}

// ---------------------------------------------------------------------------
// run_batched: 分批限速执行
// ---------------------------------------------------------------------------

/// 分批执行摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// 各批次实际包含的请求数，按执行顺序排列
    pub chunk_sizes: Vec<usize>,
}

impl BatchSummary {
    /// 已执行的请求总数
    pub fn total(&self) -> usize {
        self.chunk_sizes.iter().sum()
    }

    pub fn chunks(&self) -> usize {
        self.chunk_sizes.len()
    }
}

/// 将 `items` 按 `chunk_size` 切批，逐批并发执行 `op`
///
/// - 同一时刻最多只有一批请求在途
/// - 整次执行共享一个限速闸门，任意两次调用的启动间隔不小于 `interval`
/// - 批内任一调用失败时，等待该批全部结束后返回该批中（按原顺序）第一个错误，
///   后续批次不再执行；不收集、不吞掉部分失败
pub async fn run_batched<T, E, F, Fut>(
    items: Vec<T>,
    chunk_size: usize,
    interval: Duration,
    op: F,
) -> Result<BatchSummary, E>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: From<SyncError>,
{
    if chunk_size == 0 {
        return Err(SyncError::InvalidArgument {
            field: "chunk_size".to_string(),
            message: "批大小必须大于 0".to_string(),
        }
        .into());
    }

    let gate = Throttled::new(&op, interval);
    let mut summary = BatchSummary::default();
    let mut remaining = items.into_iter();

    loop {
        let chunk: Vec<T> = remaining.by_ref().take(chunk_size).collect();
        if chunk.is_empty() {
            break;
        }

        let chunk_index = summary.chunks();
        let size = chunk.len();
        debug!(chunk_index, size, "开始执行批次");

        let results = join_all(chunk.into_iter().map(|item| gate.call(item))).await;
        summary.chunk_sizes.push(size);

        if let Some(err) = results.into_iter().find_map(Result::err) {
            warn!(chunk_index, size, "批次中存在失败的调用，停止后续批次");
            return Err(err);
        }
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_first_call_runs_immediately() {
        let gate = Throttle::new(Duration::from_secs(60));
        let started = std::time::Instant::now();

        let value = gate.run(|| async { 7 }).await;

        assert_eq!(value, 7);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sequential_calls_are_spaced() {
        let interval = Duration::from_millis(40);
        let gate = Throttle::new(interval);
        let started = std::time::Instant::now();

        gate.acquire().await;
        gate.acquire().await;
        gate.acquire().await;

        assert!(started.elapsed() >= interval * 2);
    }

    #[tokio::test]
    async fn test_throttled_call_passes_argument() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let add = throttle(
            move |n: u32| {
                let c = c.clone();
                async move { c.fetch_add(n, Ordering::SeqCst) }
            },
            Duration::ZERO,
        );

        add.call(2).await;
        add.call(3).await;

        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_batch_summary_totals() {
        let summary = BatchSummary {
            chunk_sizes: vec![40, 40, 5],
        };
        assert_eq!(summary.total(), 85);
        assert_eq!(summary.chunks(), 3);
        assert_eq!(BatchSummary::default().total(), 0);
    }

    #[tokio::test]
    async fn test_run_batched_empty_input() {
        let summary = run_batched(Vec::<u32>::new(), 10, Duration::ZERO, |_| async {
            Ok::<_, SyncError>(())
        })
        .await
        .unwrap();

        assert_eq!(summary.chunks(), 0);
    }

    #[tokio::test]
    async fn test_run_batched_rejects_zero_chunk_size() {
        let result = run_batched(vec![1, 2, 3], 0, Duration::ZERO, |_| async {
            Ok::<_, SyncError>(())
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }
}
