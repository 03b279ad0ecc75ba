use crate::core::video::{
    now_ms, Frame, FrameDecoder, ImageDecoder, MotionDetector, MotionError, PixelDiffDetector,
    Resolution, Window,
};
use crate::motion::evaluator::{DecodeFailurePolicy, WindowEvaluator};
use crate::motion::events::{EventEmitter, EventSink, MotionEvent};
use crate::motion::prebuffer::{prebuffer_cap, PreBuffer};
use crate::motion::scheduler::WindowScheduler;
use crate::motion::state_machine::{HysteresisConfig, HysteresisMachine, MotionState, WindowAction};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// 确认运动所需的连续成功窗口数
    pub minimum_motion: u32,
    /// 运动前回看的秒数（内部再加上 minimum_motion）
    pub prebuffer_secs: f64,
    /// 检测失败后继续输出的宽限秒数
    pub postbuffer_secs: f64,
    /// 窗口间隔
    pub interval_ms: u64,
    pub resolution: Option<Resolution>,
    pub threshold: u8,
    pub min_change: u32,
    pub decode_failure: DecodeFailurePolicy,
    /// 解码线程数，`None` 时取 `min(num_cpus, 4)`
    pub decode_threads: Option<usize>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            minimum_motion: 2,
            prebuffer_secs: 4.0,
            postbuffer_secs: 4.0,
            interval_ms: 1000,
            resolution: None,
            threshold: PixelDiffDetector::DEFAULT_THRESHOLD,
            min_change: PixelDiffDetector::DEFAULT_MIN_CHANGE,
            decode_failure: DecodeFailurePolicy::NoMotion,
            decode_threads: None,
        }
    }
}

impl MotionConfig {
    pub fn for_high_motion() -> Self {
        Self {
            minimum_motion: 3,
            interval_ms: 500,
            threshold: 32,
            min_change: 50,
            ..Default::default()
        }
    }

    pub fn for_low_motion() -> Self {
        Self {
            minimum_motion: 2,
            postbuffer_secs: 6.0,
            threshold: 15,
            min_change: 5,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, MotionError> {
        let config: MotionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MotionError> {
        if self.minimum_motion == 0 {
            return Err(MotionError::InvalidConfig(
                "minimum_motion must be at least 1".to_string(),
            ));
        }
        if self.interval_ms == 0 {
            return Err(MotionError::InvalidConfig(
                "interval_ms must be positive".to_string(),
            ));
        }
        for (name, secs) in [
            ("prebuffer_secs", self.prebuffer_secs),
            ("postbuffer_secs", self.postbuffer_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(MotionError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, secs
                )));
            }
        }
        if let Some(res) = self.resolution {
            if res.pixel_count() == 0 {
                return Err(MotionError::InvalidConfig(format!(
                    "resolution must be non-empty, got {}x{}",
                    res.width, res.height
                )));
            }
        }
        if self.decode_threads == Some(0) {
            return Err(MotionError::InvalidConfig(
                "decode_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn prebuffer_cap(&self) -> usize {
        prebuffer_cap(self.prebuffer_secs, self.minimum_motion, self.interval_ms)
    }

    pub fn hysteresis_config(&self) -> HysteresisConfig {
        HysteresisConfig {
            minimum_motion: self.minimum_motion,
            interval_ms: self.interval_ms,
            postbuffer_ms: (self.postbuffer_secs * 1000.0).floor() as u64,
        }
    }

    fn decode_threads(&self) -> usize {
        self.decode_threads
            .unwrap_or_else(|| num_cpus::get().min(4))
            .max(1)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames_written: u64,
    pub windows_evaluated: u64,
    pub frames_emitted: u64,
    pub episodes: u64,
    pub key_frame_batches: u64,
    pub decode_failures: u64,
}

/// 运动片段提取流
///
/// 写入的帧按 `interval_ms` 分窗，每个窗口判定一次是否有运动，
/// 再由滞回状态机决定缓存、输出还是结束片段。所有状态修改都经过 `&mut self`，
/// 窗口结果严格按提交顺序生效。
pub struct MotionStream {
    config: MotionConfig,
    scheduler: WindowScheduler,
    evaluator: WindowEvaluator,
    machine: HysteresisMachine,
    prebuffer: PreBuffer,
    emitter: EventEmitter,
    pool: rayon::ThreadPool,
    writable: bool,
    frames_written: u64,
}

impl MotionStream {
    pub fn new(
        config: MotionConfig,
        decoder: impl FrameDecoder + 'static,
        detector: impl MotionDetector + 'static,
        sink: impl EventSink + 'static,
    ) -> Result<Self, MotionError> {
        crate::init_logging();
        config.validate()?;

        let hysteresis = config.hysteresis_config();
        let cap = config.prebuffer_cap();
        // 更长的空档不会再改变状态
        let gap_limit = cap as u64 + hysteresis.grace_windows() + 1;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.decode_threads())
            .thread_name(|i| format!("motion-decode-{}", i))
            .build()?;

        info!(
            "🎬 MotionStream: created (interval={}ms, minimum_motion={}, prebuffer_cap={}, grace_windows={})",
            config.interval_ms,
            config.minimum_motion,
            cap,
            hysteresis.grace_windows()
        );

        Ok(Self {
            scheduler: WindowScheduler::new(config.interval_ms).with_gap_limit(gap_limit),
            evaluator: WindowEvaluator::new(
                Box::new(decoder),
                Box::new(detector),
                config.resolution,
                config.decode_failure,
            ),
            machine: HysteresisMachine::with_config(hysteresis),
            prebuffer: PreBuffer::new(cap),
            emitter: EventEmitter::new(sink),
            pool,
            writable: true,
            frames_written: 0,
            config,
        })
    }

    /// 默认协作者：图像解码 + 帧差检测
    pub fn with_defaults(
        config: MotionConfig,
        sink: impl EventSink + 'static,
    ) -> Result<Self, MotionError> {
        let detector = PixelDiffDetector::with_threshold(config.threshold, config.min_change);
        Self::new(config, ImageDecoder::new(), detector, sink)
    }

    pub fn with_channel(
        config: MotionConfig,
        decoder: impl FrameDecoder + 'static,
        detector: impl MotionDetector + 'static,
    ) -> Result<(Self, Receiver<MotionEvent>), MotionError> {
        let (tx, rx) = mpsc::channel();
        let stream = Self::new(config, decoder, detector, tx)?;
        Ok((stream, rx))
    }

    /// 写入一帧，采集时间取当前时间
    pub fn write(&mut self, payload: impl Into<Arc<[u8]>>) -> Result<(), MotionError> {
        self.write_frame(payload, now_ms())
    }

    pub fn write_frame(
        &mut self,
        payload: impl Into<Arc<[u8]>>,
        timestamp_ms: u64,
    ) -> Result<(), MotionError> {
        if !self.writable {
            warn!("MotionStream: write after end, frame dropped");
            return Err(MotionError::StreamClosed);
        }

        let frame = Frame::new(payload, timestamp_ms, self.frames_written);
        self.frames_written += 1;

        let windows = self.scheduler.push(frame);
        self.process_windows(windows);
        Ok(())
    }

    pub fn tick(&mut self) {
        self.tick_at(now_ms());
    }

    pub fn tick_at(&mut self, now_ms: u64) {
        let windows = self.scheduler.tick(now_ms);
        self.process_windows(windows);
    }

    /// 立即关闭当前窗口并处理
    pub fn flush_window(&mut self) {
        if let Some(window) = self.scheduler.flush() {
            self.process_window(window);
        }
    }

    pub fn process_window(&mut self, window: Window) {
        let decoded = self.evaluator.decode(&window);
        self.apply(window, decoded);
    }

    /// 并行解码各窗口首帧，再按提交顺序逐个生效
    pub fn process_windows(&mut self, windows: Vec<Window>) {
        match windows.len() {
            0 => {}
            1 => {
                for window in windows {
                    self.process_window(window);
                }
            }
            _ => {
                let stage = self.evaluator.decode_stage();
                let decoded: Vec<_> = self
                    .pool
                    .install(|| windows.par_iter().map(|w| stage.decode(w)).collect());

                for (window, decoded) in windows.into_iter().zip(decoded) {
                    self.apply(window, decoded);
                }
            }
        }
    }

    fn apply(&mut self, window: Window, decoded: Option<Result<image::GrayImage, MotionError>>) {
        let evaluation = self.evaluator.judge(&window, decoded);
        if let Some(batch) = evaluation.key_frames {
            debug!("🖼️ Sending {} key frames", batch.len());
            self.emitter.send_key_frames(batch);
        }

        let index = window.index;
        match self.machine.on_window(evaluation.motion) {
            WindowAction::Cache => self.prebuffer.cache(window),
            WindowAction::Abandon => {
                // 触发帧保留到片段真正结束，下一次确认仍以它开场
                debug!("Window {}: probe abandoned before confirmation", index);
                self.prebuffer.cache(window);
            }
            WindowAction::Confirm => {
                if let Some(frame) = self.evaluator.detect_frame().cloned() {
                    info!(
                        "🟢 Motion confirmed at window {} (detect frame {})",
                        index, frame.frame_number
                    );
                    self.emitter.set_has_motion(true, frame);
                }
                let frames = self.prebuffer.flush_with(window);
                self.emitter.send_frames(frames);
            }
            WindowAction::Emit => self.emitter.send_frames(window.into_frames()),
            WindowAction::Stop => {
                if let Some(frame) = self.evaluator.close_episode() {
                    info!(
                        "🔴 Motion stopped at window {} (detect frame {})",
                        index, frame.frame_number
                    );
                    self.emitter.set_has_motion(false, frame);
                }
                self.prebuffer.cache(window);
            }
        }
    }

    /// 停止接受写入；已缓存的窗口不会被输出
    pub fn end(&mut self) {
        if self.writable {
            info!("⏹️ MotionStream: ended after {} frames", self.frames_written);
        }
        self.writable = false;
    }

    /// 同 `end`，并释放所有缓存的帧
    pub fn destroy(&mut self) {
        self.end();
        self.scheduler.clear();
        self.prebuffer.clear();
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn state(&self) -> &MotionState {
        self.machine.current_state()
    }

    pub fn has_motion(&self) -> bool {
        self.emitter.has_motion()
    }

    pub fn prebuffer_len(&self) -> usize {
        self.prebuffer.len()
    }

    pub fn prebuffer_cap(&self) -> usize {
        self.prebuffer.cap()
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn stats(&self) -> StreamStats {
        let emitted = self.emitter.stats();
        StreamStats {
            frames_written: self.frames_written,
            windows_evaluated: self.machine.window_count(),
            frames_emitted: emitted.frames_emitted,
            episodes: emitted.episodes,
            key_frame_batches: emitted.key_frame_batches,
            decode_failures: self.evaluator.decode_failures(),
        }
    }
}

impl Drop for MotionStream {
    fn drop(&mut self) {
        debug!("🗑️ MotionStream: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::video::{MockMotionDetector, RawLumaDecoder};
    use crate::motion::key_frames::KEY_FRAME_LIMIT;

    fn create_stream(
        config: MotionConfig,
        verdicts: Vec<bool>,
    ) -> (MotionStream, Receiver<MotionEvent>) {
        MotionStream::with_channel(
            config,
            RawLumaDecoder::new(2, 2),
            MockMotionDetector::with_sequence(verdicts),
        )
        .unwrap()
    }

    fn scenario_config() -> MotionConfig {
        MotionConfig {
            minimum_motion: 2,
            prebuffer_secs: 4.0,
            postbuffer_secs: 2.0,
            interval_ms: 1000,
            decode_threads: Some(2),
            ..Default::default()
        }
    }

    fn create_test_frame(n: u64) -> Frame {
        Frame::new(vec![n as u8; 4], n * 1000, n)
    }

    /// 每个窗口一帧，帧号即窗口号
    fn single_frame_window(n: u64) -> Window {
        Window::new(n, n * 1000, vec![create_test_frame(n)])
    }

    fn data_numbers(events: &[MotionEvent]) -> Vec<u64> {
        events
            .iter()
            .filter_map(|e| match e {
                MotionEvent::Data(f) => Some(f.frame_number),
                _ => None,
            })
            .collect()
    }

    fn count_starts(events: &[MotionEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, MotionEvent::MotionStart(_)))
            .count()
    }

    #[test]
    fn test_config_defaults() {
        let config = MotionConfig::default();

        assert_eq!(config.minimum_motion, 2);
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.prebuffer_cap(), 6);
        assert_eq!(config.hysteresis_config().postbuffer_ms, 4000);
        assert!(config.validate().is_ok());
        assert!(MotionConfig::for_high_motion().validate().is_ok());
        assert!(MotionConfig::for_low_motion().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad = [
            MotionConfig {
                minimum_motion: 0,
                ..Default::default()
            },
            MotionConfig {
                interval_ms: 0,
                ..Default::default()
            },
            MotionConfig {
                prebuffer_secs: -1.0,
                ..Default::default()
            },
            MotionConfig {
                postbuffer_secs: f64::INFINITY,
                ..Default::default()
            },
            MotionConfig {
                decode_threads: Some(0),
                ..Default::default()
            },
            MotionConfig {
                resolution: Some(Resolution::new(0, 240)),
                ..Default::default()
            },
            MotionConfig {
                resolution: Some(Resolution::new(320, 0)),
                ..Default::default()
            },
        ];

        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(MotionError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_config_from_json() {
        let config = MotionConfig::from_json(
            r#"{"minimum_motion": 3, "interval_ms": 500, "decode_failure": "repeat_last",
                "resolution": {"width": 320, "height": 240}}"#,
        )
        .unwrap();

        assert_eq!(config.minimum_motion, 3);
        assert_eq!(config.interval_ms, 500);
        assert_eq!(config.decode_failure, DecodeFailurePolicy::RepeatLast);
        assert_eq!(config.resolution, Some(Resolution::new(320, 240)));
        assert_eq!(config.prebuffer_secs, 4.0);

        assert!(matches!(
            MotionConfig::from_json(r#"{"interval_ms": 0}"#),
            Err(MotionError::InvalidConfig(_))
        ));
        assert!(matches!(
            MotionConfig::from_json("not json"),
            Err(MotionError::Json(_))
        ));
    }

    #[test]
    fn test_prebuffer_cap_degenerate_interval() {
        let config = MotionConfig {
            interval_ms: 3_600_000,
            ..Default::default()
        };
        let (stream, _rx) = create_stream(config, vec![]);

        assert_eq!(stream.prebuffer_cap(), 1);
    }

    #[test]
    fn test_scenario_fail_fail_fail_success_success_fail_fail_fail() {
        let verdicts = vec![false, false, false, true, true, false, false, false];
        let (mut stream, rx) = create_stream(scenario_config(), verdicts);

        for n in 0..4 {
            stream.process_window(single_frame_window(n));
        }
        assert_eq!(rx.try_iter().count(), 0);
        assert_eq!(stream.prebuffer_len(), 4);

        for n in 4..8 {
            stream.process_window(single_frame_window(n));
        }

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        let mut expected = vec![MotionEvent::MotionStart(create_test_frame(3))];
        expected.extend((0..5).map(|n| MotionEvent::Data(create_test_frame(n))));
        expected.push(MotionEvent::KeyFrames(vec![
            create_test_frame(3),
            create_test_frame(4),
        ]));
        expected.push(MotionEvent::Data(create_test_frame(5)));
        expected.push(MotionEvent::Data(create_test_frame(6)));
        expected.push(MotionEvent::MotionStop(create_test_frame(3)));
        assert_eq!(events, expected);

        // 结束片段的那个失败窗口回到预缓冲
        assert_eq!(stream.prebuffer_len(), 1);
        assert_eq!(stream.state(), &MotionState::Idle);
        assert!(!stream.has_motion());

        let stats = stream.stats();
        assert_eq!(stats.windows_evaluated, 8);
        assert_eq!(stats.frames_emitted, 7);
        assert_eq!(stats.episodes, 1);
        assert_eq!(stats.key_frame_batches, 1);
    }

    #[test]
    fn test_below_minimum_motion_never_starts() {
        let config = MotionConfig {
            minimum_motion: 3,
            ..scenario_config()
        };
        let (mut stream, rx) = create_stream(config, vec![true, true, false, true, true, false]);

        for n in 0..6 {
            stream.process_window(single_frame_window(n));
        }

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        assert_eq!(count_starts(&events), 0);
        assert!(data_numbers(&events).is_empty());
        assert_eq!(stream.prebuffer_len(), 6);
    }

    #[test]
    fn test_motion_start_is_edge_triggered() {
        let (mut stream, rx) = create_stream(scenario_config(), vec![true; 20]);

        for n in 0..20 {
            stream.process_window(single_frame_window(n));
        }

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        assert_eq!(count_starts(&events), 1);
        assert_eq!(data_numbers(&events), (0..20).collect::<Vec<_>>());
        assert!(matches!(events[0], MotionEvent::MotionStart(_)));
    }

    #[test]
    fn test_flush_respects_prebuffer_cap() {
        let config = MotionConfig {
            prebuffer_secs: 1.0,
            ..scenario_config()
        };
        // cap = (1 + 2) * 1000 / 1000 = 3
        let mut verdicts = vec![false; 6];
        verdicts.extend([true, true]);
        let (mut stream, rx) = create_stream(config, verdicts);

        for n in 0..8 {
            stream.process_window(single_frame_window(n));
        }

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        // 3 个缓存窗口（4、5、6）加确认窗口 7
        assert_eq!(data_numbers(&events), vec![4, 5, 6, 7]);
        assert_eq!(stream.prebuffer_len(), 0);
    }

    #[test]
    fn test_postbuffer_grace_windows() {
        let config = MotionConfig {
            postbuffer_secs: 3.0,
            ..scenario_config()
        };
        let mut verdicts = vec![true, true];
        verdicts.extend([false; 6]);
        let (mut stream, rx) = create_stream(config, verdicts);

        for n in 0..8 {
            stream.process_window(single_frame_window(n));
        }

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        // floor(3000 / 1000) = 3 个失败窗口仍然输出
        assert_eq!(data_numbers(&events), vec![0, 1, 2, 3, 4]);
        let stop_at = events
            .iter()
            .position(|e| matches!(e, MotionEvent::MotionStop(_)))
            .unwrap();
        assert_eq!(stop_at, events.len() - 1);
        assert_eq!(stream.prebuffer_len(), 3);
    }

    #[test]
    fn test_second_episode_gets_new_detect_frame() {
        let config = MotionConfig {
            postbuffer_secs: 0.0,
            ..scenario_config()
        };
        let verdicts = vec![true, true, false, false, true, true];
        let (mut stream, rx) = create_stream(config, verdicts);

        for n in 0..6 {
            stream.process_window(single_frame_window(n));
        }

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        let markers: Vec<(&str, u64)> = events
            .iter()
            .filter_map(|e| match e {
                MotionEvent::MotionStart(f) => Some(("start", f.frame_number)),
                MotionEvent::MotionStop(f) => Some(("stop", f.frame_number)),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec![("start", 0), ("stop", 0), ("start", 4)]);
        // 第二个片段回放了 2、3 两个缓存窗口
        assert_eq!(data_numbers(&events), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_abandoned_probe_keeps_detect_frame() {
        let verdicts = vec![true, false, false, true, true];
        let (mut stream, rx) = create_stream(scenario_config(), verdicts);

        for n in 0..5 {
            stream.process_window(single_frame_window(n));
        }

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        let batches: Vec<&Vec<Frame>> = events
            .iter()
            .filter_map(|e| match e {
                MotionEvent::KeyFrames(frames) => Some(frames),
                _ => None,
            })
            .collect();
        // 关键帧只在第一次失败时发出一次，窗口 3 不会重新开始收集
        assert_eq!(batches, vec![&vec![create_test_frame(0)]]);
        assert!(events.contains(&MotionEvent::MotionStart(create_test_frame(0))));
        assert_eq!(count_starts(&events), 1);
        assert_eq!(data_numbers(&events), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_detect_frame_cleared_only_on_stop() {
        let config = MotionConfig {
            postbuffer_secs: 0.0,
            ..scenario_config()
        };
        let verdicts = vec![true, false, true, true, false, true, true];
        let (mut stream, rx) = create_stream(config, verdicts);

        for n in 0..7 {
            stream.process_window(single_frame_window(n));
        }

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        let markers: Vec<(&str, u64)> = events
            .iter()
            .filter_map(|e| match e {
                MotionEvent::MotionStart(f) => Some(("start", f.frame_number)),
                MotionEvent::MotionStop(f) => Some(("stop", f.frame_number)),
                _ => None,
            })
            .collect();
        assert_eq!(markers, vec![("start", 0), ("stop", 0), ("start", 5)]);
    }

    #[test]
    fn test_key_frames_at_most_five() {
        let (mut stream, rx) = create_stream(scenario_config(), vec![true; 12]);

        for n in 0..12 {
            stream.process_window(single_frame_window(n));
        }

        let batches: Vec<Vec<Frame>> = rx
            .try_iter()
            .filter_map(|e| match e {
                MotionEvent::KeyFrames(frames) => Some(frames),
                _ => None,
            })
            .collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), KEY_FRAME_LIMIT);
    }

    #[test]
    fn test_decode_failure_policies() {
        let broken = |n: u64| Window::new(n, n * 1000, vec![Frame::new(vec![0u8; 3], n * 1000, n)]);
        let config = |policy: DecodeFailurePolicy| MotionConfig {
            minimum_motion: 1,
            postbuffer_secs: 0.0,
            decode_failure: policy,
            ..scenario_config()
        };

        let (mut stream, rx) = create_stream(config(DecodeFailurePolicy::NoMotion), vec![true]);
        stream.process_window(single_frame_window(0));
        stream.process_window(broken(1));
        let events: Vec<MotionEvent> = rx.try_iter().collect();
        assert!(matches!(events.last(), Some(MotionEvent::MotionStop(_))));
        assert_eq!(stream.stats().decode_failures, 1);

        let (mut stream, rx) = create_stream(config(DecodeFailurePolicy::RepeatLast), vec![true]);
        stream.process_window(single_frame_window(0));
        stream.process_window(broken(1));
        stream.process_window(broken(2));
        let events: Vec<MotionEvent> = rx.try_iter().collect();
        assert_eq!(data_numbers(&events), vec![0, 1, 2]);
        assert!(stream.has_motion());
    }

    #[test]
    fn test_write_frames_are_windowed() {
        let (mut stream, rx) = create_stream(scenario_config(), vec![false, true, true]);

        for (n, ts) in [0u64, 500, 1000, 1500, 2000, 2500, 3000].iter().enumerate() {
            stream.write_frame(vec![n as u8; 4], *ts).unwrap();
        }

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        match &events[0] {
            MotionEvent::MotionStart(frame) => assert_eq!(frame.frame_number, 2),
            other => panic!("expected motion start, got {:?}", other),
        }
        assert_eq!(data_numbers(&events), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(stream.stats().frames_written, 7);
    }

    #[test]
    fn test_process_windows_keeps_submission_order() {
        let (mut stream, rx) = create_stream(scenario_config(), vec![true; 16]);

        stream.process_windows((0..16).map(single_frame_window).collect());

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        assert_eq!(data_numbers(&events), (0..16).collect::<Vec<_>>());
        assert_eq!(stream.stats().windows_evaluated, 16);
    }

    #[test]
    fn test_tick_ends_episode_without_frames() {
        let (mut stream, rx) = create_stream(scenario_config(), vec![true, true]);

        stream.write_frame(vec![0u8; 4], 0).unwrap();
        stream.write_frame(vec![1u8; 4], 1000).unwrap();
        stream.tick_at(2000);
        assert!(stream.has_motion());

        // 空窗口判为无运动：两个宽限窗口后结束
        stream.tick_at(5000);
        let events: Vec<MotionEvent> = rx.try_iter().collect();
        assert!(matches!(events.last(), Some(MotionEvent::MotionStop(_))));
        assert!(!stream.has_motion());
    }

    #[test]
    fn test_end_is_idempotent() {
        let (mut stream, rx) = create_stream(scenario_config(), vec![]);

        stream.write_frame(vec![0u8; 4], 0).unwrap();
        stream.end();
        stream.end();

        assert!(!stream.is_writable());
        assert!(matches!(
            stream.write_frame(vec![1u8; 4], 10),
            Err(MotionError::StreamClosed)
        ));
        assert_eq!(rx.try_iter().count(), 0);
        assert_eq!(stream.stats().frames_written, 1);
    }

    #[test]
    fn test_destroy_releases_buffers() {
        let (mut stream, _rx) = create_stream(scenario_config(), vec![]);

        stream.write_frame(vec![0u8; 4], 0).unwrap();
        stream.write_frame(vec![1u8; 4], 1000).unwrap();
        assert_eq!(stream.prebuffer_len(), 1);

        stream.destroy();
        stream.destroy();

        assert!(!stream.is_writable());
        assert_eq!(stream.prebuffer_len(), 0);
        assert!(matches!(stream.write(vec![2u8; 4]), Err(MotionError::StreamClosed)));
    }

    #[test]
    fn test_with_defaults_detects_pixel_change() {
        use image::{GrayImage, ImageOutputFormat, Luma};
        use std::io::Cursor;

        let encode = |fill: u8| {
            let img = GrayImage::from_pixel(16, 16, Luma([fill]));
            let mut buffer = Cursor::new(Vec::new());
            img.write_to(&mut buffer, ImageOutputFormat::Png).unwrap();
            buffer.into_inner()
        };

        let (tx, rx) = mpsc::channel();
        let config = MotionConfig {
            minimum_motion: 1,
            ..scenario_config()
        };
        let mut stream = MotionStream::with_defaults(config, tx).unwrap();

        stream.write_frame(encode(0), 0).unwrap();
        stream.write_frame(encode(255), 1000).unwrap();
        stream.flush_window();

        let events: Vec<MotionEvent> = rx.try_iter().collect();
        assert_eq!(count_starts(&events), 1);
        assert_eq!(data_numbers(&events), vec![0, 1]);
    }
}
