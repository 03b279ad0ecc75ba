//! 帧解码 - 把原始负载变成可分析的灰度图

use super::error::MotionError;
use super::frame::Resolution;
use image::imageops::FilterType;
use image::{GenericImageView, GrayImage};

pub trait FrameDecoder: Send + Sync {
    fn decode(
        &self,
        payload: &[u8],
        resolution: Option<Resolution>,
    ) -> Result<GrayImage, MotionError>;
}

/// 编码图像解码器（JPEG / PNG / BMP）
#[derive(Debug, Clone, Default)]
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for ImageDecoder {
    fn decode(
        &self,
        payload: &[u8],
        resolution: Option<Resolution>,
    ) -> Result<GrayImage, MotionError> {
        if payload.is_empty() {
            return Err(MotionError::EmptyPayload);
        }

        let img = image::load_from_memory(payload)?;
        let (width, height) = img.dimensions();
        let img = match resolution {
            Some(res) if res.width != width || res.height != height => {
                img.resize_exact(res.width, res.height, FilterType::Triangle)
            }
            _ => img,
        };

        Ok(img.to_luma8())
    }
}

/// 原始 Y 平面解码器，负载就是 width * height 个亮度字节
#[derive(Debug, Clone, Copy)]
pub struct RawLumaDecoder {
    width: u32,
    height: u32,
}

impl RawLumaDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn expected_len(&self) -> usize {
        Resolution::new(self.width, self.height).pixel_count()
    }
}

impl FrameDecoder for RawLumaDecoder {
    fn decode(
        &self,
        payload: &[u8],
        resolution: Option<Resolution>,
    ) -> Result<GrayImage, MotionError> {
        if payload.is_empty() {
            return Err(MotionError::EmptyPayload);
        }
        if payload.len() != self.expected_len() {
            return Err(MotionError::Decode(format!(
                "raw luma plane is {} bytes, expected {}x{} = {}",
                payload.len(),
                self.width,
                self.height,
                self.expected_len()
            )));
        }

        let img = GrayImage::from_raw(self.width, self.height, payload.to_vec())
            .ok_or_else(|| MotionError::Decode("invalid luma plane".to_string()))?;

        match resolution {
            Some(res) if res.width != self.width || res.height != self.height => Ok(
                image::imageops::resize(&img, res.width, res.height, FilterType::Triangle),
            ),
            _ => Ok(img),
        }
    }
}
