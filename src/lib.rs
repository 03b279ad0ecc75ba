pub mod core;
pub mod motion;

pub use crate::core::video::{Frame, MotionError, Resolution, Window};
pub use crate::motion::{MotionConfig, MotionEvent, MotionStream};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("motion_clip"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // 重复初始化时忽略错误
        let _ = env_logger::builder().is_test(cfg!(test)).try_init();
    }
}
