//! 限速器与分批执行器的集成测试
//!
//! 使用真实时间验证启动间隔与批次边界，间隔取几十毫秒以控制测试耗时。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use order_sync_shared::error::SyncError;
use order_sync_shared::throttle::{run_batched, throttle};
use parking_lot::Mutex;

// ==================== Throttle ====================

#[tokio::test]
async fn test_concurrent_calls_all_execute_and_respect_spacing() {
    const N: usize = 6;
    let interval = Duration::from_millis(25);

    let executions = Arc::new(AtomicUsize::new(0));
    let starts = Arc::new(Mutex::new(Vec::new()));

    let exec = executions.clone();
    let st = starts.clone();
    let noop = throttle(
        move |_: usize| {
            let exec = exec.clone();
            let st = st.clone();
            async move {
                st.lock().push(Instant::now());
                exec.fetch_add(1, Ordering::SeqCst);
            }
        },
        interval,
    );

    let begin = Instant::now();
    futures::future::join_all((0..N).map(|i| noop.call(i))).await;
    let elapsed = begin.elapsed();

    assert_eq!(executions.load(Ordering::SeqCst), N);
    assert!(
        elapsed >= interval * (N as u32 - 1),
        "elapsed {elapsed:?} shorter than {:?}",
        interval * (N as u32 - 1)
    );

    let mut starts = starts.lock().clone();
    starts.sort();
    for pair in starts.windows(2) {
        // 启动时间在闸门放行后才记录，允许 1ms 记录误差
        assert!(pair[1].duration_since(pair[0]) + Duration::from_millis(1) >= interval);
    }
}

// ==================== run_batched ====================

#[derive(Debug, Clone, Copy)]
struct Span {
    index: usize,
    start: Instant,
    end: Instant,
}

#[tokio::test]
async fn test_85_items_form_chunks_of_40_40_5_in_order() {
    let spans = Arc::new(Mutex::new(Vec::<Span>::new()));
    let items: Vec<usize> = (0..85).collect();

    let recorder = spans.clone();
    let summary = run_batched(items, 40, Duration::ZERO, move |index: usize| {
        let recorder = recorder.clone();
        async move {
            let start = Instant::now();
            // 不同请求耗时不同，验证下一批不会在慢请求结束前启动
            tokio::time::sleep(Duration::from_millis((index % 4) as u64 * 2)).await;
            recorder.lock().push(Span {
                index,
                start,
                end: Instant::now(),
            });
            Ok::<_, SyncError>(())
        }
    })
    .await
    .unwrap();

    assert_eq!(summary.chunk_sizes, vec![40, 40, 5]);
    assert_eq!(summary.total(), 85);

    let spans = spans.lock().clone();
    assert_eq!(spans.len(), 85);

    for chunk in 0..2 {
        let last_end = spans
            .iter()
            .filter(|s| s.index / 40 == chunk)
            .map(|s| s.end)
            .max()
            .unwrap();
        let next_start = spans
            .iter()
            .filter(|s| s.index / 40 == chunk + 1)
            .map(|s| s.start)
            .min()
            .unwrap();
        assert!(
            next_start >= last_end,
            "chunk {} started before chunk {} settled",
            chunk + 1,
            chunk
        );
    }
}

#[tokio::test]
async fn test_failure_settles_chunk_and_stops_later_chunks() {
    let settled = Arc::new(Mutex::new(Vec::<usize>::new()));
    let items: Vec<usize> = (0..12).collect();

    let recorder = settled.clone();
    let result = run_batched(items, 4, Duration::ZERO, move |index: usize| {
        let recorder = recorder.clone();
        async move {
            if index == 5 {
                recorder.lock().push(index);
                return Err(SyncError::external("subscriptions", "HTTP 429"));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            recorder.lock().push(index);
            Ok(())
        }
    })
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "外部服务错误: subscriptions - HTTP 429");

    let mut settled = settled.lock().clone();
    settled.sort();
    // 第 0、1 批全部结束（包括失败请求之后的 6、7），第 2 批从未启动
    assert_eq!(settled, (0..8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_batches_share_one_gate_across_chunks() {
    let interval = Duration::from_millis(20);
    let starts = Arc::new(Mutex::new(Vec::new()));

    let recorder = starts.clone();
    run_batched((0..5).collect::<Vec<u32>>(), 2, interval, move |_| {
        let recorder = recorder.clone();
        async move {
            recorder.lock().push(Instant::now());
            Ok::<_, SyncError>(())
        }
    })
    .await
    .unwrap();

    let mut starts = starts.lock().clone();
    starts.sort();
    assert_eq!(starts.len(), 5);
    for pair in starts.windows(2) {
        // 启动时间在闸门放行后才记录，允许 1ms 记录误差
        assert!(pair[1].duration_since(pair[0]) + Duration::from_millis(1) >= interval);
    }
}
