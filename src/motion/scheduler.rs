//! 时间窗口调度 - 按固定间隔把帧分批

use crate::core::video::{Frame, Window};
use log::debug;

struct OpenWindow {
    start_ms: u64,
    frames: Vec<Frame>,
}

/// 按帧时间戳切分窗口，不依赖后台定时器
///
/// 第一帧到达时在其时间戳处开窗，之后窗口边界落在 `start + k * interval` 上。
/// 中间没有帧的周期会产生空窗口，保证时间流逝能推动后缓冲计时。
pub struct WindowScheduler {
    interval_ms: u64,
    gap_limit: Option<u64>,
    open: Option<OpenWindow>,
    next_index: u64,
    skipped_windows: u64,
}

impl WindowScheduler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            gap_limit: None,
            open: None,
            next_index: 0,
            skipped_windows: 0,
        }
    }

    /// 一次空档最多补出 `max_windows` 个空窗口，多出来的直接跳过
    pub fn with_gap_limit(mut self, max_windows: u64) -> Self {
        self.gap_limit = Some(max_windows);
        self
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn push(&mut self, frame: Frame) -> Vec<Window> {
        let closed = if self.open.is_some() {
            self.close_elapsed(frame.timestamp_ms)
        } else {
            self.open = Some(OpenWindow {
                start_ms: frame.timestamp_ms,
                frames: Vec::new(),
            });
            Vec::new()
        };

        if let Some(open) = self.open.as_mut() {
            open.frames.push(frame);
        }

        closed
    }

    /// 定时器入口：关闭在 `now_ms` 之前已经结束的窗口
    pub fn tick(&mut self, now_ms: u64) -> Vec<Window> {
        self.close_elapsed(now_ms)
    }

    /// 不管时间，立即关闭当前窗口
    pub fn flush(&mut self) -> Option<Window> {
        let open = self.open.take()?;
        Some(self.emit(open.start_ms, open.frames))
    }

    pub fn clear(&mut self) {
        self.open = None;
    }

    pub fn pending_len(&self) -> usize {
        self.open.as_ref().map(|o| o.frames.len()).unwrap_or(0)
    }

    pub fn skipped_windows(&self) -> u64 {
        self.skipped_windows
    }

    fn close_elapsed(&mut self, now_ms: u64) -> Vec<Window> {
        let interval = self.interval_ms;
        let open = match self.open.take() {
            Some(open) => open,
            None => return Vec::new(),
        };

        if now_ms < open.start_ms.saturating_add(interval) {
            self.open = Some(open);
            return Vec::new();
        }

        let elapsed = (now_ms - open.start_ms) / interval;
        let empty = elapsed - 1;
        let emitted_empty = match self.gap_limit {
            Some(limit) => empty.min(limit),
            None => empty,
        };

        let mut closed = Vec::with_capacity(emitted_empty as usize + 1);
        closed.push(self.emit(open.start_ms, open.frames));
        for i in 1..=emitted_empty {
            closed.push(self.emit(open.start_ms + i * interval, Vec::new()));
        }

        if emitted_empty < empty {
            let skipped = empty - emitted_empty;
            self.skipped_windows += skipped;
            debug!("⏭️ Skipped {} empty windows after a {}ms gap", skipped, now_ms - open.start_ms);
        }

        self.open = Some(OpenWindow {
            start_ms: open.start_ms + elapsed * interval,
            frames: Vec::new(),
        });

        closed
    }

    fn emit(&mut self, start_ms: u64, frames: Vec<Frame>) -> Window {
        let window = Window::new(self.next_index, start_ms, frames);
        self.next_index += 1;
        window
    }
}
