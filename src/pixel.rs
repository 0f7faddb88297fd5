//! # 像素模块
//!
//! 像素以 ARGB 四个独立通道表示。与磁盘字节之间的转换显式地按通道顺序进行，
//! 不把字节直接重新解释为平台原生整数。

/// 一个 ARGB 像素。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub alpha: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Default for Pixel {
    fn default() -> Self {
        Self::rgb(0, 0, 0)
    }
}

impl Pixel {
    pub const fn new(alpha: u8, red: u8, green: u8, blue: u8) -> Self {
        Self {
            alpha,
            red,
            green,
            blue,
        }
    }

    /// 不透明像素。
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::new(u8::MAX, red, green, blue)
    }

    /// 从打包的 `0xAARRGGBB` 值构造。
    pub const fn from_argb(argb: u32) -> Self {
        Self::new(
            (argb >> 24) as u8,
            (argb >> 16) as u8,
            (argb >> 8) as u8,
            argb as u8,
        )
    }

    /// 打包为 `0xAARRGGBB`。
    pub const fn argb(self) -> u32 {
        (self.alpha as u32) << 24
            | (self.red as u32) << 16
            | (self.green as u32) << 8
            | self.blue as u32
    }

    /// 32bpp 磁盘顺序：B, G, R, A (sRGB 位域下的小端序 ARGB)。
    pub(crate) fn from_bgra(bytes: [u8; 4]) -> Self {
        Self::from_argb(u32::from_le_bytes(bytes))
    }

    pub(crate) fn to_bgra(self) -> [u8; 4] {
        self.argb().to_le_bytes()
    }

    /// 24bpp 磁盘顺序：B, G, R。没有 alpha 通道，读出时视为不透明。
    pub(crate) fn from_bgr(bytes: [u8; 3]) -> Self {
        Self::rgb(bytes[2], bytes[1], bytes[0])
    }

    pub(crate) fn to_bgr(self) -> [u8; 3] {
        [self.blue, self.green, self.red]
    }
}
