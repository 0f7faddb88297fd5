//! # bmp_lsb 库
//!
//! 本库包含 BMP 可变位宽 LSB 隐写工具的核心逻辑：
//! [`bitmap`] 负责 BMP 文件的读写与像素访问，[`steganography`] 负责数据的隐藏与恢复。

// 声明库包含的所有模块。

pub mod atomic_file;
pub mod bitmap;
pub mod cli;
pub mod constants;
pub mod error;
pub mod handler;
pub mod header;
pub mod pixel;
pub mod steganography;

pub use bitmap::Bitmap;
pub use error::{FormatError, Result, StegError};
pub use pixel::Pixel;
pub use steganography::{BitWidth, choose_minimum_width, decode, encode};
