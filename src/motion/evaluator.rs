//! 窗口判定：解码首帧、运行检测器、维护关键帧收集

use super::key_frames::KeyFrameCollector;
use crate::core::video::{Frame, FrameDecoder, MotionDetector, MotionError, Resolution, Window};
use image::GrayImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// 解码失败时如何给窗口定性
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailurePolicy {
    /// 视为无运动。连续解码失败会被当作运动消失，可能提前结束片段。
    #[default]
    NoMotion,
    /// 沿用上一个窗口的结果
    RepeatLast,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub motion: bool,
    /// 本窗口结束了关键帧收集时，带出整批关键帧
    pub key_frames: Option<Vec<Frame>>,
}

#[derive(Clone, Copy)]
pub struct DecodeStage<'a> {
    decoder: &'a dyn FrameDecoder,
    resolution: Option<Resolution>,
}

impl DecodeStage<'_> {
    /// 解码窗口首帧；空窗口返回 `None`
    pub fn decode(&self, window: &Window) -> Option<Result<GrayImage, MotionError>> {
        window
            .first()
            .map(|frame| self.decoder.decode(frame.payload(), self.resolution))
    }
}

pub struct WindowEvaluator {
    decoder: Box<dyn FrameDecoder>,
    detector: Box<dyn MotionDetector>,
    resolution: Option<Resolution>,
    policy: DecodeFailurePolicy,
    detect_frame: Option<Frame>,
    key_frames: KeyFrameCollector,
    last_verdict: bool,
    decode_failures: u64,
}

impl WindowEvaluator {
    pub fn new(
        decoder: Box<dyn FrameDecoder>,
        detector: Box<dyn MotionDetector>,
        resolution: Option<Resolution>,
        policy: DecodeFailurePolicy,
    ) -> Self {
        Self {
            decoder,
            detector,
            resolution,
            policy,
            detect_frame: None,
            key_frames: KeyFrameCollector::new(),
            last_verdict: false,
            decode_failures: 0,
        }
    }

    /// 解码阶段只借用解码器，可以交给多个线程并行使用
    pub fn decode_stage(&self) -> DecodeStage<'_> {
        DecodeStage {
            decoder: &*self.decoder,
            resolution: self.resolution,
        }
    }

    pub fn decode(&self, window: &Window) -> Option<Result<GrayImage, MotionError>> {
        self.decode_stage().decode(window)
    }

    pub fn judge(
        &mut self,
        window: &Window,
        decoded: Option<Result<GrayImage, MotionError>>,
    ) -> Evaluation {
        let motion = match decoded {
            // 空窗口不解码也不检测
            None => false,
            Some(Ok(img)) => self.detector.detect(&img),
            Some(Err(e)) => {
                self.decode_failures += 1;
                warn!(
                    "⚠️ Window {}: decode failed ({}), applying {:?}",
                    window.index, e, self.policy
                );
                match self.policy {
                    DecodeFailurePolicy::NoMotion => false,
                    DecodeFailurePolicy::RepeatLast => self.last_verdict,
                }
            }
        };
        self.last_verdict = motion;

        let key_frames = self.advance_episode(motion, window.first());

        Evaluation { motion, key_frames }
    }

    pub fn evaluate(&mut self, window: &Window) -> Evaluation {
        let decoded = self.decode(window);
        self.judge(window, decoded)
    }

    fn advance_episode(&mut self, motion: bool, first: Option<&Frame>) -> Option<Vec<Frame>> {
        if motion && self.detect_frame.is_none() {
            if let Some(frame) = first {
                debug!("🎯 Motion detected at frame {}, opening episode", frame.frame_number);
                self.detect_frame = Some(frame.clone());
                self.key_frames.open();
            }
        }

        if !self.key_frames.is_collecting() {
            return None;
        }

        if motion {
            first.and_then(|frame| self.key_frames.push(frame.clone()))
        } else {
            self.key_frames.finish()
        }
    }

    pub fn detect_frame(&self) -> Option<&Frame> {
        self.detect_frame.as_ref()
    }

    /// 片段确认结束后调用
    pub fn close_episode(&mut self) -> Option<Frame> {
        self.key_frames.cancel();
        self.detect_frame.take()
    }

    pub fn is_collecting_key_frames(&self) -> bool {
        self.key_frames.is_collecting()
    }

    pub fn last_verdict(&self) -> bool {
        self.last_verdict
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    pub fn policy(&self) -> DecodeFailurePolicy {
        self.policy
    }
}
