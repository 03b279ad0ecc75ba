use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// 帧数据结构（原始负载，未解码）
///
/// 负载通过 `Arc` 共享，克隆一帧不会复制图像数据。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub data: Arc<[u8]>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(data: impl Into<Arc<[u8]>>, timestamp_ms: u64, frame_number: u64) -> Self {
        Self {
            data: data.into(),
            timestamp_ms,
            frame_number,
        }
    }

    /// 以当前时间作为采集时间
    pub fn captured_now(data: impl Into<Arc<[u8]>>, frame_number: u64) -> Self {
        Self::new(data, now_ms(), frame_number)
    }

    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 一个调度周期内收集到的帧，按采集顺序排列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub index: u64,
    pub opened_at_ms: u64,
    pub frames: Vec<Frame>,
}

impl Window {
    pub fn new(index: u64, opened_at_ms: u64, frames: Vec<Frame>) -> Self {
        Self {
            index,
            opened_at_ms,
            frames,
        }
    }

    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }
}

/// 解码目标分辨率，核心逻辑不解释它，只透传给解码器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

/// Milliseconds since the UNIX epoch; a clock before 1970 reads as 0.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
