//! # BMP 头部模块
//!
//! 定义文件头、信息头和颜色头三个结构，负责它们在磁盘上的小端序读写。
//! 字段按磁盘顺序逐个读写，不依赖内存布局。

use crate::constants::{
    BMP_MAGIC, COLOR_HEADER_RESERVED_WORDS, SRGB_ALPHA_MASK, SRGB_BLUE_MASK, SRGB_COLOR_SPACE,
    SRGB_GREEN_MASK, SRGB_RED_MASK,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Read, Write};

/// 位于文件开头的 14 字节文件头。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub file_type: u16,
    /// 整个文件的字节数。
    pub file_size: u32,
    pub reserved1: u16,
    pub reserved2: u16,
    /// 像素数据在文件中的起始位置。
    pub offset_data: u32,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            file_type: BMP_MAGIC,
            file_size: 0,
            reserved1: 0,
            reserved2: 0,
            offset_data: 0,
        }
    }
}

impl FileHeader {
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            file_type: reader.read_u16::<LittleEndian>()?,
            file_size: reader.read_u32::<LittleEndian>()?,
            reserved1: reader.read_u16::<LittleEndian>()?,
            reserved2: reader.read_u16::<LittleEndian>()?,
            offset_data: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.file_type)?;
        writer.write_u32::<LittleEndian>(self.file_size)?;
        writer.write_u16::<LittleEndian>(self.reserved1)?;
        writer.write_u16::<LittleEndian>(self.reserved2)?;
        writer.write_u32::<LittleEndian>(self.offset_data)
    }
}

impl fmt::Display for FileHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File type: {:#06x}", self.file_type)?;
        writeln!(f, "File size: {}", self.file_size)?;
        writeln!(f, "Reserved1: {}", self.reserved1)?;
        writeln!(f, "Reserved2: {}", self.reserved2)?;
        writeln!(f, "Offset at: {:#x}", self.offset_data)
    }
}

/// 40 字节的 BITMAPINFOHEADER。
///
/// `height` 为正表示行从下往上存储，为负表示从上往下。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoHeader {
    pub size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    /// 不压缩时为 0。
    pub size_image: u32,
    pub x_pixels_per_meter: i32,
    pub y_pixels_per_meter: i32,
    pub colors_used: u32,
    pub colors_important: u32,
}

impl Default for InfoHeader {
    fn default() -> Self {
        Self {
            size: 0,
            width: 0,
            height: 0,
            planes: 1,
            bit_count: 0,
            compression: 0,
            size_image: 0,
            x_pixels_per_meter: 0,
            y_pixels_per_meter: 0,
            colors_used: 0,
            colors_important: 0,
        }
    }
}

impl InfoHeader {
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            size: reader.read_u32::<LittleEndian>()?,
            width: reader.read_i32::<LittleEndian>()?,
            height: reader.read_i32::<LittleEndian>()?,
            planes: reader.read_u16::<LittleEndian>()?,
            bit_count: reader.read_u16::<LittleEndian>()?,
            compression: reader.read_u32::<LittleEndian>()?,
            size_image: reader.read_u32::<LittleEndian>()?,
            x_pixels_per_meter: reader.read_i32::<LittleEndian>()?,
            y_pixels_per_meter: reader.read_i32::<LittleEndian>()?,
            colors_used: reader.read_u32::<LittleEndian>()?,
            colors_important: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_i32::<LittleEndian>(self.width)?;
        writer.write_i32::<LittleEndian>(self.height)?;
        writer.write_u16::<LittleEndian>(self.planes)?;
        writer.write_u16::<LittleEndian>(self.bit_count)?;
        writer.write_u32::<LittleEndian>(self.compression)?;
        writer.write_u32::<LittleEndian>(self.size_image)?;
        writer.write_i32::<LittleEndian>(self.x_pixels_per_meter)?;
        writer.write_i32::<LittleEndian>(self.y_pixels_per_meter)?;
        writer.write_u32::<LittleEndian>(self.colors_used)?;
        writer.write_u32::<LittleEndian>(self.colors_important)
    }
}

impl fmt::Display for InfoHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Info size: {}", self.size)?;
        writeln!(f, "Image width: {}", self.width)?;
        writeln!(f, "Image height: {}", self.height)?;
        writeln!(f, "Planes: {}", self.planes)?;
        writeln!(f, "BPP: {}", self.bit_count)?;
        writeln!(f, "Compression: {}", self.compression)?;
        writeln!(f, "Size image: {}", self.size_image)?;
        writeln!(f, "X ppm: {}", self.x_pixels_per_meter)?;
        writeln!(f, "Y ppm: {}", self.y_pixels_per_meter)?;
        writeln!(f, "Colors used: {}", self.colors_used)?;
        writeln!(f, "Colors important: {}", self.colors_important)
    }
}

/// 32bpp 图像紧跟在信息头之后的 68 字节颜色头。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorHeader {
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
    pub alpha_mask: u32,
    pub color_space_type: u32,
    pub reserved: [u32; COLOR_HEADER_RESERVED_WORDS],
}

impl Default for ColorHeader {
    /// 标准 sRGB 颜色头。
    fn default() -> Self {
        Self {
            red_mask: SRGB_RED_MASK,
            green_mask: SRGB_GREEN_MASK,
            blue_mask: SRGB_BLUE_MASK,
            alpha_mask: SRGB_ALPHA_MASK,
            color_space_type: SRGB_COLOR_SPACE,
            reserved: [0; COLOR_HEADER_RESERVED_WORDS],
        }
    }
}

impl ColorHeader {
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut header = Self {
            red_mask: reader.read_u32::<LittleEndian>()?,
            green_mask: reader.read_u32::<LittleEndian>()?,
            blue_mask: reader.read_u32::<LittleEndian>()?,
            alpha_mask: reader.read_u32::<LittleEndian>()?,
            color_space_type: reader.read_u32::<LittleEndian>()?,
            reserved: [0; COLOR_HEADER_RESERVED_WORDS],
        };
        reader.read_u32_into::<LittleEndian>(&mut header.reserved)?;
        Ok(header)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.red_mask)?;
        writer.write_u32::<LittleEndian>(self.green_mask)?;
        writer.write_u32::<LittleEndian>(self.blue_mask)?;
        writer.write_u32::<LittleEndian>(self.alpha_mask)?;
        writer.write_u32::<LittleEndian>(self.color_space_type)?;
        self.reserved
            .iter()
            .try_for_each(|&word| writer.write_u32::<LittleEndian>(word))
    }

    /// 掩码和颜色空间标签是否与标准 sRGB 完全一致。保留字段不参与比较。
    pub fn is_standard(&self) -> bool {
        let standard = Self::default();
        self.red_mask == standard.red_mask
            && self.green_mask == standard.green_mask
            && self.blue_mask == standard.blue_mask
            && self.alpha_mask == standard.alpha_mask
            && self.color_space_type == standard.color_space_type
    }
}

impl fmt::Display for ColorHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Red mask: {:#010x}", self.red_mask)?;
        writeln!(f, "Green mask: {:#010x}", self.green_mask)?;
        writeln!(f, "Blue mask: {:#010x}", self.blue_mask)?;
        writeln!(f, "Alpha mask: {:#010x}", self.alpha_mask)?;
        writeln!(f, "Color space: {:#010x}", self.color_space_type)?;
        let reserved: Vec<String> = self.reserved.iter().map(u32::to_string).collect();
        writeln!(f, "Unused: {}", reserved.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{COLOR_HEADER_SIZE, FILE_HEADER_SIZE, INFO_HEADER_SIZE};
    use std::io::Cursor;

    #[test]
    fn header_sizes_match_disk_layout() {
        let mut buf = Vec::new();
        FileHeader::default().write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), FILE_HEADER_SIZE as usize);

        buf.clear();
        InfoHeader::default().write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), INFO_HEADER_SIZE as usize);

        buf.clear();
        ColorHeader::default().write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), COLOR_HEADER_SIZE as usize);
    }

    #[test]
    fn file_header_is_little_endian() {
        let header = FileHeader {
            file_size: 0x0102_0304,
            offset_data: 54,
            ..FileHeader::default()
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..2], b"BM");
        assert_eq!(&buf[2..6], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&buf[10..14], &[54, 0, 0, 0]);
        assert_eq!(FileHeader::read_from(&mut Cursor::new(&buf)).unwrap(), header);
    }

    #[test]
    fn info_header_keeps_signed_height() {
        let header = InfoHeader {
            size: 40,
            width: 7,
            height: -3,
            bit_count: 24,
            ..InfoHeader::default()
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();

        assert_eq!(&buf[8..12], &(-3i32).to_le_bytes());
        let parsed = InfoHeader::read_from(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(parsed.height, -3);
        assert_eq!(parsed.planes, 1);
    }

    #[test]
    fn color_header_standard_check() {
        assert!(ColorHeader::default().is_standard());

        let tagged = ColorHeader {
            color_space_type: 0x5769_6E20, // "Win "
            ..ColorHeader::default()
        };
        assert!(!tagged.is_standard());

        let swapped = ColorHeader {
            red_mask: SRGB_BLUE_MASK,
            blue_mask: SRGB_RED_MASK,
            ..ColorHeader::default()
        };
        assert!(!swapped.is_standard());

        let mut reserved = ColorHeader::default();
        reserved.reserved[3] = 0xDEAD;
        assert!(reserved.is_standard());
    }

    #[test]
    fn short_input_is_an_io_error() {
        let err = InfoHeader::read_from(&mut Cursor::new([0u8; 12])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
