//! # 位图容器模块
//!
//! [`Bitmap`] 持有三个头部以及去掉行填充后的像素字节。
//! 读取时丢弃每行末尾的填充字节，写入时重新补上，调用者看到的始终是一块连续的字节区域。

use crate::atomic_file::write_atomically;
use crate::constants::{
    BMP_MAGIC, COLOR_HEADER_SIZE, COMPRESSION_BITFIELDS, COMPRESSION_RGB, FILE_HEADER_SIZE,
    INFO_HEADER_SIZE, STRIDE_ALIGN,
};
use crate::error::{FormatError, Result, StegError};
use crate::header::{ColorHeader, FileHeader, InfoHeader};
use crate::pixel::Pixel;
use log::{debug, trace};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// 把一行像素补齐到 4 字节边界所需的填充字节数。
///
/// 只看行的实际字节数，而不是像素宽度。
pub fn row_padding(row_bytes: usize) -> usize {
    (STRIDE_ALIGN - row_bytes % STRIDE_ALIGN) % STRIDE_ALIGN
}

/// 由尺寸推出的像素缓冲区布局。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    row_stride: usize,
    padding: usize,
    /// 内存中像素缓冲区的字节数 (不含填充)。
    data_len: usize,
    /// 磁盘上像素数据的字节数 (含填充)。
    padded_len: u64,
}

impl Layout {
    /// 任何一步溢出都返回 `None`。
    fn new(width: u32, height: u32, bytes_per_pixel: usize) -> Option<Self> {
        let row_stride = usize::try_from(width).ok()?.checked_mul(bytes_per_pixel)?;
        let padding = row_padding(row_stride);
        let height = usize::try_from(height).ok()?;
        let data_len = row_stride.checked_mul(height)?;
        let padded_len = u64::try_from(row_stride.checked_add(padding)?)
            .ok()?
            .checked_mul(height as u64)?;
        Some(Self {
            row_stride,
            padding,
            data_len,
            padded_len,
        })
    }

    fn checked(width: i32, height: i32, bytes_per_pixel: usize) -> Result<Self> {
        if width < 0 {
            return Err(FormatError::InvalidDimensions { width, height }.into());
        }
        Self::new(width.unsigned_abs(), height.unsigned_abs(), bytes_per_pixel)
            .ok_or_else(|| FormatError::InvalidDimensions { width, height }.into())
    }
}

/// 未压缩的 24bpp 或 32bpp 位图。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    file_header: FileHeader,
    info_header: InfoHeader,
    color_header: Option<ColorHeader>,
    data: Vec<u8>,
    row_stride: usize,
}

impl Bitmap {
    /// 在内存中创建一张全零的位图。
    ///
    /// `has_alpha` 为真时创建带标准 sRGB 颜色头的 32bpp 图像，否则为 24bpp。
    /// `height` 的符号原样保存，用来表示行顺序。
    ///
    /// # Panics
    ///
    /// `width` 为负或像素缓冲区大小超出 `usize` 时 panic。需要处理这些情况时使用 [`Bitmap::try_create`]。
    pub fn create(width: i32, height: i32, has_alpha: bool) -> Self {
        match Self::try_create(width, height, has_alpha) {
            Ok(bitmap) => bitmap,
            Err(err) => panic!("cannot create bitmap: {err}"),
        }
    }

    /// [`Bitmap::create`] 的可失败版本。
    ///
    /// # Errors
    ///
    /// `width` 为负或像素缓冲区大小溢出时返回 [`FormatError::InvalidDimensions`]。
    pub fn try_create(width: i32, height: i32, has_alpha: bool) -> Result<Self> {
        let (bit_count, compression, color_header) = if has_alpha {
            (32, COMPRESSION_BITFIELDS, Some(ColorHeader::default()))
        } else {
            (24, COMPRESSION_RGB, None)
        };

        let info_header = InfoHeader {
            size: header_size(has_alpha),
            width,
            height,
            bit_count,
            compression,
            ..InfoHeader::default()
        };

        let layout = Layout::checked(width, height, usize::from(bit_count / 8))?;

        let mut bitmap = Self {
            file_header: FileHeader::default(),
            info_header,
            color_header,
            data: vec![0; layout.data_len],
            row_stride: layout.row_stride,
        };
        bitmap.normalize_file_header();
        Ok(bitmap)
    }

    /// 从文件读取位图。
    ///
    /// # Errors
    ///
    /// * 文件签名不是 "BM"：[`FormatError::BadMagic`]。
    /// * 位深度不是 24 或 32：[`FormatError::UnsupportedBitDepth`]。
    /// * 宽度为负或尺寸导致缓冲区大小溢出：[`FormatError::InvalidDimensions`]。
    /// * 32bpp 但颜色头缺失或不是标准 sRGB：[`FormatError::UnsupportedColorHeader`]，此时尚未读取任何像素数据。
    /// * 像素数据比头部声明的短：[`FormatError::TruncatedPixelData`]。
    /// * 任何底层 I/O 失败：[`StegError::Io`]。
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| StegError::io("open", path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| StegError::io("inspect", path, e))?
            .len();
        let mut reader = BufReader::new(file);

        Self::read_from(&mut reader, file_len).map_err(|err| match err {
            StegError::Io { operation, source, .. } => StegError::io(operation, path, source),
            other => other,
        })
    }

    /// 从任意可定位的输入读取位图，`stream_len` 为输入的总字节数。
    pub fn read_from<R: Read + Seek>(reader: &mut R, stream_len: u64) -> Result<Self> {
        let read_err = |e: io::Error| StegError::io("read", "<stream>", e);

        let file_header = FileHeader::read_from(reader).map_err(read_err)?;
        if file_header.file_type != BMP_MAGIC {
            return Err(FormatError::BadMagic(file_header.file_type).into());
        }

        let mut info_header = InfoHeader::read_from(reader).map_err(read_err)?;
        let (color_header, expected_compression) = match info_header.bit_count {
            24 => (None, COMPRESSION_RGB),
            32 => {
                if info_header.size < INFO_HEADER_SIZE + COLOR_HEADER_SIZE {
                    return Err(FormatError::UnsupportedColorHeader.into());
                }
                let color_header = ColorHeader::read_from(reader).map_err(read_err)?;
                if !color_header.is_standard() {
                    return Err(FormatError::UnsupportedColorHeader.into());
                }
                (Some(color_header), COMPRESSION_BITFIELDS)
            }
            other => return Err(FormatError::UnsupportedBitDepth(other).into()),
        };
        if info_header.compression != expected_compression {
            return Err(FormatError::UnsupportedCompression {
                bits_per_pixel: info_header.bit_count,
                compression: info_header.compression,
            }
            .into());
        }

        let declared_offset = file_header.offset_data;
        let Layout {
            row_stride,
            padding,
            data_len,
            padded_len: expected,
        } = Layout::checked(
            info_header.width,
            info_header.height,
            usize::from(info_header.bit_count / 8),
        )?;

        let available = stream_len.saturating_sub(u64::from(declared_offset));
        if expected > available {
            return Err(FormatError::TruncatedPixelData {
                expected,
                available,
            }
            .into());
        }

        reader
            .seek(SeekFrom::Start(u64::from(declared_offset)))
            .map_err(read_err)?;

        let mut data = vec![0; data_len];
        if padding == 0 {
            reader.read_exact(&mut data).map_err(read_err)?;
        } else {
            let mut padding_row = [0u8; STRIDE_ALIGN];
            for row in data.chunks_exact_mut(row_stride) {
                reader.read_exact(row).map_err(read_err)?;
                reader
                    .read_exact(&mut padding_row[..padding])
                    .map_err(read_err)?;
            }
        }

        // 丢弃信息头中多余的扩展字段以及头部和像素数据之间的空隙。
        info_header.size = header_size(color_header.is_some());

        let mut bitmap = Self {
            file_header,
            info_header,
            color_header,
            data,
            row_stride,
        };
        bitmap.normalize_file_header();

        debug!(
            "Loaded {}x{} bitmap, {} bpp, row stride {} (+{} padding), pixel data was at offset {}",
            bitmap.width(),
            bitmap.height(),
            bitmap.bits_per_pixel(),
            row_stride,
            padding,
            declared_offset
        );
        Ok(bitmap)
    }

    /// 将位图写入文件。
    ///
    /// 通过 [`write_atomically`] 写入，失败时不会留下写了一半的目标文件。
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.check_bit_depth()?;

        write_atomically(path, |writer| self.write_to(writer))
            .map_err(|e| StegError::io("write", path, e))?;

        debug!("Stored {} bytes to {}", self.file_header.file_size, path.display());
        Ok(())
    }

    /// 按磁盘格式输出整个位图，每行末尾补零填充。
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.check_bit_depth()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        self.file_header.write_to(writer)?;
        self.info_header.write_to(writer)?;
        if let Some(color_header) = &self.color_header {
            color_header.write_to(writer)?;
        }

        let padding = row_padding(self.row_stride);
        if padding == 0 {
            writer.write_all(&self.data)?;
        } else {
            let padding_row = [0u8; STRIDE_ALIGN];
            for row in self.data.chunks_exact(self.row_stride) {
                writer.write_all(row)?;
                writer.write_all(&padding_row[..padding])?;
            }
        }
        Ok(())
    }

    /// 读取 `(x, y)` 处的像素。`y` 按存储顺序计数。
    pub fn pixel_at(&self, x: u32, y: u32) -> Result<Pixel> {
        let offset = self.pixel_offset(x, y)?;
        let bytes = &self.data[offset..offset + self.bytes_per_pixel()];
        Ok(match *bytes {
            [b, g, r, a] => Pixel::from_bgra([b, g, r, a]),
            [b, g, r] => Pixel::from_bgr([b, g, r]),
            _ => unreachable!("bytes per pixel is always 3 or 4"),
        })
    }

    /// 写入 `(x, y)` 处的像素。24bpp 图像会丢弃 alpha 通道。
    pub fn set_pixel_at(&mut self, x: u32, y: u32, pixel: Pixel) -> Result<()> {
        let offset = self.pixel_offset(x, y)?;
        if self.bytes_per_pixel() == 4 {
            self.data[offset..offset + 4].copy_from_slice(&pixel.to_bgra());
        } else {
            self.data[offset..offset + 3].copy_from_slice(&pixel.to_bgr());
        }
        Ok(())
    }

    fn pixel_offset(&self, x: u32, y: u32) -> Result<usize> {
        let (width, height) = (self.width(), self.height());
        if x >= width || y >= height {
            return Err(StegError::PixelOutOfBounds {
                x,
                y,
                width,
                height,
            });
        }
        Ok((x as usize + y as usize * width as usize) * self.bytes_per_pixel())
    }

    /// 像素缓冲区中第 `index` 个字节，越界时返回 `None`。
    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    pub fn byte_at_mut(&mut self, index: usize) -> Option<&mut u8> {
        self.data.get_mut(index)
    }

    /// 不含行填充的像素字节。
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// 可用于隐写的像素字节总数。
    pub fn capacity_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn width(&self) -> u32 {
        self.info_header.width.unsigned_abs()
    }

    /// 图像的行数，不含符号。
    pub fn height(&self) -> u32 {
        self.info_header.height.unsigned_abs()
    }

    /// 行是否从上往下存储 (高度为负)。
    pub fn is_top_down(&self) -> bool {
        self.info_header.height < 0
    }

    pub fn bits_per_pixel(&self) -> u16 {
        self.info_header.bit_count
    }

    pub fn bytes_per_pixel(&self) -> usize {
        usize::from(self.info_header.bit_count / 8)
    }

    /// 内存中一行的字节数。
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// 磁盘上一行的字节数 (含填充)。
    pub fn padded_row_stride(&self) -> usize {
        self.row_stride + row_padding(self.row_stride)
    }

    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    pub fn info_header(&self) -> &InfoHeader {
        &self.info_header
    }

    pub fn color_header(&self) -> Option<&ColorHeader> {
        self.color_header.as_ref()
    }

    fn check_bit_depth(&self) -> Result<()> {
        match self.info_header.bit_count {
            24 | 32 => Ok(()),
            other => Err(FormatError::UnsupportedBitDepth(other).into()),
        }
    }

    /// 根据当前头部和像素尺寸重新计算像素偏移量和文件大小。
    fn normalize_file_header(&mut self) {
        let offset = FILE_HEADER_SIZE + header_size(self.color_header.is_some());
        let pixel_bytes = self.padded_row_stride() as u64 * u64::from(self.height());
        self.file_header.offset_data = offset;
        self.file_header.file_size =
            u32::try_from(u64::from(offset) + pixel_bytes).unwrap_or(u32::MAX);
        trace!(
            "Normalized file header: offset {}, file size {}",
            self.file_header.offset_data,
            self.file_header.file_size
        );
    }
}

/// 信息头声明的大小：32bpp 时包含紧随其后的颜色头。
fn header_size(has_color_header: bool) -> u32 {
    if has_color_header {
        INFO_HEADER_SIZE + COLOR_HEADER_SIZE
    } else {
        INFO_HEADER_SIZE
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Headers:")?;
        writeln!(f, "{}", self.file_header)?;
        writeln!(f, "{}", self.info_header)?;
        if let Some(color_header) = &self.color_header {
            writeln!(f, "{color_header}")?;
        }
        writeln!(
            f,
            "Pixel count: {}",
            u64::from(self.width()) * u64::from(self.height())
        )?;
        writeln!(f, "Data size: {}", self.data.len())?;
        write!(f, "Row stride: {}", self.row_stride)
    }
}
