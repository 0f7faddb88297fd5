/// BMP 文件签名 "BM" (小端序读取后的值)。
pub const BMP_MAGIC: u16 = 0x4D42;

/// 文件头在磁盘上的固定大小 (字节)。
pub const FILE_HEADER_SIZE: u32 = 14;

/// 信息头 (BITMAPINFOHEADER) 在磁盘上的固定大小 (字节)。
pub const INFO_HEADER_SIZE: u32 = 40;

/// 颜色头在磁盘上的固定大小 (字节)，仅在 32bpp 时存在。
pub const COLOR_HEADER_SIZE: u32 = 68;

/// 颜色头中保留字段的数量 (每个 4 字节)。
pub const COLOR_HEADER_RESERVED_WORDS: usize = 16;

/// 磁盘上的每一行像素都会被填充到该字节数的整数倍。
pub const STRIDE_ALIGN: usize = 4;

/// 不压缩 (24bpp)。
pub const COMPRESSION_RGB: u32 = 0;

/// 位域 (32bpp，带 alpha 通道)。
pub const COMPRESSION_BITFIELDS: u32 = 3;

/// 标准 sRGB 颜色头的通道掩码。
pub const SRGB_RED_MASK: u32 = 0x00FF_0000;
pub const SRGB_GREEN_MASK: u32 = 0x0000_FF00;
pub const SRGB_BLUE_MASK: u32 = 0x0000_00FF;
pub const SRGB_ALPHA_MASK: u32 = 0xFF00_0000;

/// 颜色空间标签 "sRGB"。
pub const SRGB_COLOR_SPACE: u32 = 0x7352_4742;

/// 存放位宽选择器的像素字节数，每个字节只使用 1 个最低有效位。
pub const WIDTH_SELECTOR_BYTES: usize = 3;

/// 负载长度前缀的字节数 (大端序 `u32`)。
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// 自动选择位宽时允许的最大值。
/// 位宽 8 会替换整个字节，只有显式指定时才会使用。
pub const MAX_AUTO_BIT_WIDTH: u8 = 7;

/// 显式指定时允许的最大位宽。
pub const MAX_BIT_WIDTH: u8 = 8;
