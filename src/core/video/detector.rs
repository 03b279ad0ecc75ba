use image::GrayImage;

pub trait MotionDetector: Send {
    fn detect(&mut self, image: &GrayImage) -> bool;

    /// 丢弃内部参考帧
    fn reset(&mut self) {}
}

/// 帧差运动检测器
///
/// 与上一帧逐像素比较亮度，差值超过 `threshold` 的像素计为变化，
/// 变化像素数达到 `min_change` 即判定为运动。
pub struct PixelDiffDetector {
    threshold: u8,
    min_change: u32,
    last_frame: Option<GrayImage>,
}

impl PixelDiffDetector {
    pub const DEFAULT_THRESHOLD: u8 = 21;
    pub const DEFAULT_MIN_CHANGE: u32 = 10;

    pub fn new() -> Self {
        Self::with_threshold(Self::DEFAULT_THRESHOLD, Self::DEFAULT_MIN_CHANGE)
    }

    pub fn with_threshold(threshold: u8, min_change: u32) -> Self {
        Self {
            threshold,
            min_change,
            last_frame: None,
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn min_change(&self) -> u32 {
        self.min_change
    }

    fn changed_pixels(&self, previous: &GrayImage, current: &GrayImage) -> u32 {
        previous
            .as_raw()
            .iter()
            .zip(current.as_raw().iter())
            .filter(|(a, b)| a.abs_diff(**b) > self.threshold)
            .count() as u32
    }
}

impl Default for PixelDiffDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionDetector for PixelDiffDetector {
    fn detect(&mut self, image: &GrayImage) -> bool {
        // 第一帧或尺寸变化时只建立参考帧
        let motion = match &self.last_frame {
            Some(prev) if prev.dimensions() == image.dimensions() => {
                self.changed_pixels(prev, image) >= self.min_change
            }
            _ => false,
        };

        self.last_frame = Some(image.clone());
        motion
    }

    fn reset(&mut self) {
        self.last_frame = None;
    }
}

pub struct MockMotionDetector {
    // 按调用序号（从 0 开始）给出结果
    pattern: Option<Box<dyn Fn(u64) -> bool + Send>>,
    calls: u64,
}

impl MockMotionDetector {
    pub fn new() -> Self {
        Self {
            pattern: None,
            calls: 0,
        }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(u64) -> bool + Send + 'static,
    {
        Self {
            pattern: Some(Box::new(pattern)),
            calls: 0,
        }
    }

    /// Replays `verdicts` in order, then reports no motion.
    pub fn with_sequence(verdicts: Vec<bool>) -> Self {
        Self::with_pattern(move |n| verdicts.get(n as usize).copied().unwrap_or(false))
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for MockMotionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionDetector for MockMotionDetector {
    fn detect(&mut self, _image: &GrayImage) -> bool {
        let n = self.calls;
        self.calls += 1;
        self.pattern.as_ref().map(|p| p(n)).unwrap_or(false)
    }
}
