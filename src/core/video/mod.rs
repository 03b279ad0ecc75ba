pub mod decoder;
pub mod detector;
pub mod error;
pub mod frame;

pub use decoder::{FrameDecoder, ImageDecoder, RawLumaDecoder};
pub use detector::{MockMotionDetector, MotionDetector, PixelDiffDetector};
pub use error::MotionError;
pub use frame::{now_ms, Frame, Resolution, Window};
