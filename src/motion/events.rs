//! 输出事件

use crate::core::video::Frame;
use log::debug;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotionEvent {
    /// 片段中的一帧
    Data(Frame),
    /// 确认运动，携带触发检测的那一帧
    MotionStart(Frame),
    /// 片段结束，携带同一触发帧
    MotionStop(Frame),
    /// 片段开头的 1-5 帧预览
    KeyFrames(Vec<Frame>),
}

pub trait EventSink: Send {
    fn send(&mut self, event: MotionEvent);
}

impl EventSink for Sender<MotionEvent> {
    fn send(&mut self, event: MotionEvent) {
        // 接收端已经关闭时丢弃事件，流本身继续运行
        if Sender::send(self, event).is_err() {
            debug!("event receiver dropped, discarding event");
        }
    }
}

/// 用闭包接收事件
pub struct CallbackSink<F>(pub F);

impl<F> EventSink for CallbackSink<F>
where
    F: FnMut(MotionEvent) + Send,
{
    fn send(&mut self, event: MotionEvent) {
        (self.0)(event)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterStats {
    pub frames_emitted: u64,
    pub episodes: u64,
    pub key_frame_batches: u64,
}

/// 事件发送器：不缓存，逐个交给下游
pub struct EventEmitter {
    sink: Box<dyn EventSink>,
    has_motion: bool,
    stats: EmitterStats,
}

impl EventEmitter {
    pub fn new(sink: impl EventSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            has_motion: false,
            stats: EmitterStats::default(),
        }
    }

    pub fn has_motion(&self) -> bool {
        self.has_motion
    }

    pub fn stats(&self) -> EmitterStats {
        self.stats
    }

    /// 边沿触发：只有状态变化时才发 motion_start / motion_stop
    pub fn set_has_motion(&mut self, has_motion: bool, detect_frame: Frame) {
        if has_motion && !self.has_motion {
            self.stats.episodes += 1;
            self.sink.send(MotionEvent::MotionStart(detect_frame));
        } else if !has_motion && self.has_motion {
            self.sink.send(MotionEvent::MotionStop(detect_frame));
        }
        self.has_motion = has_motion;
    }

    pub fn send_frames(&mut self, frames: impl IntoIterator<Item = Frame>) {
        for frame in frames {
            self.stats.frames_emitted += 1;
            self.sink.send(MotionEvent::Data(frame));
        }
    }

    pub fn send_key_frames(&mut self, frames: Vec<Frame>) {
        if frames.is_empty() {
            return;
        }
        self.stats.key_frame_batches += 1;
        self.sink.send(MotionEvent::KeyFrames(frames));
    }
}
