use crate::core::video::Frame;

/// 每个运动片段最多预览的关键帧数
pub const KEY_FRAME_LIMIT: usize = 5;

/// 运动片段开头的关键帧收集器
///
/// `None` 表示当前没有在收集。
#[derive(Debug, Default)]
pub struct KeyFrameCollector {
    frames: Option<Vec<Frame>>,
}

impl KeyFrameCollector {
    pub fn new() -> Self {
        Self { frames: None }
    }

    pub fn open(&mut self) {
        self.frames = Some(Vec::with_capacity(KEY_FRAME_LIMIT));
    }

    pub fn is_collecting(&self) -> bool {
        self.frames.is_some()
    }

    pub fn len(&self) -> usize {
        self.frames.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 追加一帧；达到上限时结束收集并返回整批
    pub fn push(&mut self, frame: Frame) -> Option<Vec<Frame>> {
        let frames = self.frames.as_mut()?;
        if frames.len() < KEY_FRAME_LIMIT {
            frames.push(frame);
        }
        if frames.len() >= KEY_FRAME_LIMIT {
            return self.finish();
        }
        None
    }

    /// 结束收集；没有收集到任何帧时返回 `None`
    pub fn finish(&mut self) -> Option<Vec<Frame>> {
        self.frames.take().filter(|frames| !frames.is_empty())
    }

    pub fn cancel(&mut self) {
        self.frames = None;
    }
}
