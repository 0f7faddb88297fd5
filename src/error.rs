//! # 错误类型模块
//!
//! 库中所有可能失败的操作都返回 [`StegError`]，调用者可以按错误类别分别处理。

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 文件格式或隐写数据流本身不合法。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unrecognized file signature 0x{0:04X}, expected a BMP file (\"BM\")")]
    BadMagic(u16),

    /// 32bpp 图像缺少颜色头，或者颜色头不是标准 sRGB。
    #[error("Missing or non-standard color header, only sRGB bitfields are supported")]
    UnsupportedColorHeader,

    #[error("Unsupported bit depth: {0} bits per pixel (only 24 and 32 are supported)")]
    UnsupportedBitDepth(u16),

    #[error("Unsupported compression {compression} for {bits_per_pixel} bits per pixel")]
    UnsupportedCompression { bits_per_pixel: u16, compression: u32 },

    /// 宽度为负，或者像素缓冲区的大小超出了可寻址范围。
    #[error("Invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("Pixel data is truncated: expected {expected} bytes, only {available} available")]
    TruncatedPixelData { expected: u64, available: u64 },

    /// 解码时声明的长度超出了图像的字节数。
    #[error("Hidden stream is truncated: needs {needed} image bytes, only {available} available")]
    TruncatedStream { needed: u64, available: usize },
}

#[derive(Error, Debug)]
pub enum StegError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Bit width {0} is out of range, expected a value in 1..=8")]
    Range(u8),

    /// `width` 为 `None` 表示自动选择时没有任何位宽能容纳负载。
    #[error("Not enough space in the image: {needed} bytes required, {available} available{}", .width.map(|w| format!(" at {w} bits per byte")).unwrap_or_default())]
    Capacity {
        needed: u64,
        available: usize,
        width: Option<u8>,
    },

    #[error("Pixel ({x}, {y}) is outside the {width}x{height} image")]
    PixelOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("Unable to {operation} {}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StegError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        StegError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StegError>;
