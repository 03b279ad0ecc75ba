//! 运动片段提取 - 从连续视频帧中切出有运动的片段
//!
//! 核心策略：
//! 1. 定时分窗 - 每个窗口只解码首帧做一次运动判定
//! 2. 滞回确认 - 连续成功达到门槛才确认运动，抑制单窗口误报
//! 3. 预缓冲 - 保留确认前的最近窗口，确认时一并输出
//! 4. 后缓冲 - 检测失败后在宽限期内继续输出，避免短暂停顿截断片段
//! 5. 关键帧 - 片段开头最多 5 帧，用于快速预览

pub mod evaluator;
pub mod events;
pub mod key_frames;
pub mod pipeline;
pub mod prebuffer;
pub mod scheduler;
pub mod state_machine;

pub use evaluator::{DecodeFailurePolicy, Evaluation, WindowEvaluator};
pub use events::{CallbackSink, EmitterStats, EventEmitter, EventSink, MotionEvent};
pub use key_frames::{KeyFrameCollector, KEY_FRAME_LIMIT};
pub use pipeline::{MotionConfig, MotionStream, StreamStats};
pub use prebuffer::{prebuffer_cap, PreBuffer};
pub use scheduler::WindowScheduler;
pub use state_machine::{HysteresisConfig, HysteresisMachine, MotionState, WindowAction};
