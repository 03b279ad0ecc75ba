use crate::core::video::{Frame, Window};
use std::collections::VecDeque;

/// 预缓冲容量（窗口数）
///
/// 探测中的窗口也要能被回放，所以 `prebuffer_secs` 先加上 `minimum_motion`。
/// 结果至少为 1。
pub fn prebuffer_cap(prebuffer_secs: f64, minimum_motion: u32, interval_ms: u64) -> usize {
    let padded_ms = (prebuffer_secs + minimum_motion as f64) * 1000.0;
    let windows = (padded_ms / interval_ms.max(1) as f64).floor();
    if windows.is_finite() && windows >= 1.0 {
        windows as usize
    } else {
        1
    }
}

/// 尚未确认属于运动片段的最近窗口，最新的在前
#[derive(Debug)]
pub struct PreBuffer {
    windows: VecDeque<Window>,
    cap: usize,
}

impl PreBuffer {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            windows: VecDeque::with_capacity(cap),
            cap,
        }
    }

    /// 插到最前面，超出容量的旧窗口直接丢弃
    pub fn cache(&mut self, window: Window) {
        self.windows.push_front(window);
        self.windows.truncate(self.cap);
    }

    /// 按发送顺序返回：最早缓存的窗口在前，最后接上当前窗口。缓冲随之清空。
    pub fn flush_with(&mut self, current: Window) -> Vec<Frame> {
        let total = self.frame_count() + current.len();
        let mut frames = Vec::with_capacity(total);

        while let Some(window) = self.windows.pop_back() {
            frames.extend(window.into_frames());
        }
        frames.extend(current.into_frames());

        frames
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn frame_count(&self) -> usize {
        self.windows.iter().map(Window::len).sum()
    }

    pub fn clear(&mut self) {
        self.windows.clear();
    }
}
