//! # 隐写核心算法模块
//!
//! 把像素缓冲区当作比特池使用。布局如下：
//!
//! 1. 前 3 个字节各用 1 个最低有效位存放位宽选择器 (高位在前)；
//! 2. 从第 3 个字节开始，以选定位宽写入大端序 `u32` 负载长度；
//! 3. 紧接着以同一位宽写入负载本身。
//!
//! 数据按字节从高位到低位形成比特流，每个图像字节只改动最低的 `width` 位，
//! 高位保留原图内容。一个数据字节可能跨越两个图像字节，反之亦然。

use crate::bitmap::Bitmap;
use crate::constants::{LENGTH_PREFIX_BYTES, MAX_AUTO_BIT_WIDTH, MAX_BIT_WIDTH, WIDTH_SELECTOR_BYTES};
use crate::error::{FormatError, Result, StegError};
use log::{debug, trace};
use std::fmt;

/// 每个图像字节中用于隐藏数据的最低位数量，取值 1..=8。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitWidth(u8);

impl BitWidth {
    pub fn new(bits: u8) -> Result<Self> {
        if (1..=MAX_BIT_WIDTH).contains(&bits) {
            Ok(Self(bits))
        } else {
            Err(StegError::Range(bits))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// 写入前 3 个字节的选择器值。3 位只能表示 0..=7，位宽 8 记为 0。
    fn selector(self) -> u8 {
        self.0 & 0b111
    }

    fn from_selector(selector: u8) -> Self {
        match selector & 0b111 {
            0 => Self(MAX_BIT_WIDTH),
            bits => Self(bits),
        }
    }

    /// 低 `width` 位的掩码。
    fn mask(self) -> u8 {
        low_mask(self.0)
    }
}

impl TryFrom<u8> for BitWidth {
    type Error = StegError;

    fn try_from(bits: u8) -> Result<Self> {
        Self::new(bits)
    }
}

impl fmt::Display for BitWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn low_mask(bits: u8) -> u8 {
    ((1u16 << bits) - 1) as u8
}

/// 以 `width` 位宽隐藏 `payload_len` 字节负载时需要的图像字节数 (含选择器和长度前缀)。
pub fn required_bytes(payload_len: usize, width: BitWidth) -> u64 {
    let data_bits = (LENGTH_PREFIX_BYTES as u64 + payload_len as u64) * 8;
    WIDTH_SELECTOR_BYTES as u64 + data_bits.div_ceil(u64::from(width.get()))
}

/// 在 `capacity_bytes` 个图像字节中以 `width` 位宽最多能隐藏的负载字节数。
pub fn max_payload_len(capacity_bytes: usize, width: BitWidth) -> usize {
    let usable = capacity_bytes.saturating_sub(WIDTH_SELECTOR_BYTES) as u64;
    let data_bytes = usable * u64::from(width.get()) / 8;
    let payload = data_bytes.saturating_sub(LENGTH_PREFIX_BYTES as u64);
    usize::try_from(payload.min(u64::from(u32::MAX))).unwrap_or(usize::MAX)
}

/// 选出能容纳负载的最小位宽。
///
/// 从 1 开始向上搜索到 7，位宽越小对图像的改动越少。位宽 8 会替换整个字节，
/// 不参与自动选择，只能显式指定。
///
/// # Errors
///
/// 1..=7 中没有任何位宽能容纳负载时返回 [`StegError::Capacity`]。
pub fn choose_minimum_width(payload_len: usize, capacity_bytes: usize) -> Result<BitWidth> {
    (1..=MAX_AUTO_BIT_WIDTH)
        .map(BitWidth)
        .find(|&width| required_bytes(payload_len, width) <= capacity_bytes as u64)
        .ok_or_else(|| StegError::Capacity {
            needed: required_bytes(payload_len, BitWidth(MAX_AUTO_BIT_WIDTH)),
            available: capacity_bytes,
            width: None,
        })
}

/// 将 `payload` 隐藏进 `cover` 的副本中，`cover` 本身不会被修改。
///
/// `width` 为 `None` 时通过 [`choose_minimum_width`] 自动选择位宽。
///
/// # Errors
///
/// * 显式位宽不在 1..=8 内：[`StegError::Range`]。
/// * 负载超过容量或长度超出 `u32`：[`StegError::Capacity`]。
///
/// 所有检查都在修改任何字节之前完成。
pub fn encode(cover: &Bitmap, payload: &[u8], width: Option<u8>) -> Result<Bitmap> {
    let capacity = cover.capacity_bytes();
    let width = match width {
        Some(bits) => BitWidth::new(bits)?,
        None => choose_minimum_width(payload.len(), capacity)?,
    };

    let needed = required_bytes(payload.len(), width);
    let length = u32::try_from(payload.len()).map_err(|_| StegError::Capacity {
        needed,
        available: capacity,
        width: Some(width.get()),
    })?;
    if needed > capacity as u64 {
        return Err(StegError::Capacity {
            needed,
            available: capacity,
            width: Some(width.get()),
        });
    }

    debug!(
        "Hiding {} bytes at {} bits per byte, using {} of {} image bytes",
        payload.len(),
        width,
        needed,
        capacity
    );

    let mut stego = cover.clone();
    let bytes = stego.as_bytes_mut();

    let selector = width.selector();
    for (i, byte) in bytes[..WIDTH_SELECTOR_BYTES].iter_mut().enumerate() {
        let bit = (selector >> (WIDTH_SELECTOR_BYTES - 1 - i)) & 1;
        *byte = (*byte & !1) | bit;
    }

    let mut writer = LsbWriter::new(&mut bytes[WIDTH_SELECTOR_BYTES..needed as usize], width);
    writer.write_bytes(&length.to_be_bytes());
    writer.write_bytes(payload);
    trace!("Packed data into {} image bytes", writer.bytes_used());

    Ok(stego)
}

/// 从 `stego` 中取出隐藏的负载。
///
/// # Errors
///
/// 图像字节不足以容纳选择器、长度前缀或声明长度的负载时，
/// 返回 [`FormatError::TruncatedStream`]。
pub fn decode(stego: &Bitmap) -> Result<Vec<u8>> {
    let bytes = stego.as_bytes();
    let available = bytes.len();
    if available < WIDTH_SELECTOR_BYTES {
        return Err(FormatError::TruncatedStream {
            needed: WIDTH_SELECTOR_BYTES as u64,
            available,
        }
        .into());
    }

    let selector = bytes[..WIDTH_SELECTOR_BYTES]
        .iter()
        .fold(0u8, |acc, &byte| (acc << 1) | (byte & 1));
    let width = BitWidth::from_selector(selector);
    debug!("Hidden data uses {width} bits per byte");

    let mut reader = LsbReader::new(&bytes[WIDTH_SELECTOR_BYTES..], width);
    let mut prefix = [0u8; LENGTH_PREFIX_BYTES];
    reader.read_bytes(&mut prefix)?;
    let length = u32::from_be_bytes(prefix) as usize;

    let needed = required_bytes(length, width);
    if needed > available as u64 {
        return Err(FormatError::TruncatedStream { needed, available }.into());
    }
    debug!("Hidden payload is {length} bytes");

    let mut payload = vec![0; length];
    reader.read_bytes(&mut payload)?;
    Ok(payload)
}

/// 把比特流写入图像字节的低位。
///
/// `image_bits_remaining` 是当前图像字节中还未使用的低位数量，为 0 时下一次写入会打开新的图像字节。
/// 打开图像字节时先清零它的低 `width` 位，高位保持不变。
struct LsbWriter<'a> {
    bytes: &'a mut [u8],
    width: BitWidth,
    opened: usize,
    image_bits_remaining: u8,
}

impl<'a> LsbWriter<'a> {
    fn new(bytes: &'a mut [u8], width: BitWidth) -> Self {
        Self {
            bytes,
            width,
            opened: 0,
            image_bits_remaining: 0,
        }
    }

    fn write_bytes(&mut self, data: &[u8]) {
        data.iter().for_each(|&byte| self.write_byte(byte));
    }

    fn write_byte(&mut self, data: u8) {
        let mut data_bits_remaining = 8u8;
        while data_bits_remaining > 0 {
            if self.image_bits_remaining == 0 {
                self.bytes[self.opened] &= !self.width.mask();
                self.opened += 1;
                self.image_bits_remaining = self.width.get();
            }

            // 取出数据中剩余的最高 k 位，放到图像字节空闲区域的最高处。
            let k = data_bits_remaining.min(self.image_bits_remaining);
            let chunk = (data >> (data_bits_remaining - k)) & low_mask(k);
            self.bytes[self.opened - 1] |= chunk << (self.image_bits_remaining - k);

            data_bits_remaining -= k;
            self.image_bits_remaining -= k;
        }
    }

    fn bytes_used(&self) -> usize {
        self.opened
    }
}

/// [`LsbWriter`] 的镜像：按相同顺序从图像字节低位取回比特流。
struct LsbReader<'a> {
    bytes: &'a [u8],
    width: BitWidth,
    opened: usize,
    current: u8,
    image_bits_remaining: u8,
}

impl<'a> LsbReader<'a> {
    fn new(bytes: &'a [u8], width: BitWidth) -> Self {
        Self {
            bytes,
            width,
            opened: 0,
            current: 0,
            image_bits_remaining: 0,
        }
    }

    fn read_bytes(&mut self, out: &mut [u8]) -> Result<()> {
        out.iter_mut().try_for_each(|byte| {
            *byte = self.read_byte()?;
            Ok(())
        })
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut value = 0u16;
        let mut data_bits_remaining = 8u8;
        while data_bits_remaining > 0 {
            if self.image_bits_remaining == 0 {
                let byte = self.bytes.get(self.opened).ok_or(FormatError::TruncatedStream {
                    needed: (WIDTH_SELECTOR_BYTES + self.opened + 1) as u64,
                    available: WIDTH_SELECTOR_BYTES + self.bytes.len(),
                })?;
                self.current = byte & self.width.mask();
                self.opened += 1;
                self.image_bits_remaining = self.width.get();
            }

            let k = data_bits_remaining.min(self.image_bits_remaining);
            let chunk = (self.current >> (self.image_bits_remaining - k)) & low_mask(k);
            value = (value << k) | u16::from(chunk);

            data_bits_remaining -= k;
            self.image_bits_remaining -= k;
        }
        Ok(value as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cover(width: i32, height: i32, has_alpha: bool, fill: u8) -> Bitmap {
        let mut bmp = Bitmap::create(width, height, has_alpha);
        bmp.as_bytes_mut().fill(fill);
        bmp
    }

    #[test]
    fn bit_width_range() {
        assert!(matches!(BitWidth::new(0), Err(StegError::Range(0))));
        assert!(matches!(BitWidth::try_from(9), Err(StegError::Range(9))));
        for bits in 1..=8 {
            assert_eq!(BitWidth::new(bits).unwrap().get(), bits);
        }
    }

    #[test]
    fn selector_maps_eight_to_zero() {
        for bits in 1..=8 {
            let width = BitWidth::new(bits).unwrap();
            assert_eq!(BitWidth::from_selector(width.selector()), width);
        }
        assert_eq!(BitWidth(8).selector(), 0);
    }

    #[test]
    fn required_bytes_matches_layout() {
        // 3 + ceil((4 + 2) * 8 / w)
        assert_eq!(required_bytes(2, BitWidth(1)), 51);
        assert_eq!(required_bytes(2, BitWidth(5)), 3 + 10);
        assert_eq!(required_bytes(2, BitWidth(7)), 3 + 7);
        assert_eq!(required_bytes(0, BitWidth(8)), 7);
    }

    #[test]
    fn minimum_width_is_smallest_fit() {
        let capacity = 48;
        let width = choose_minimum_width(2, capacity).unwrap();
        assert!(required_bytes(2, width) <= capacity as u64);
        for smaller in 1..width.get() {
            assert!(required_bytes(2, BitWidth(smaller)) > capacity as u64);
        }
        assert_eq!(width.get(), 2);
    }

    #[test]
    fn minimum_width_never_picks_eight() {
        // 能以 8 位宽放下，但 7 位宽放不下
        let capacity = required_bytes(10, BitWidth(8)) as usize;
        assert!(required_bytes(10, BitWidth(7)) > capacity as u64);
        assert!(matches!(
            choose_minimum_width(10, capacity),
            Err(StegError::Capacity { width: None, .. })
        ));
    }

    #[test]
    fn hides_hi_at_one_bit() {
        // 4x4 只有 48 字节，放不下 3 + 48 字节的数据流
        let small = Bitmap::create(4, 4, false);
        assert!(matches!(
            encode(&small, b"hi", Some(1)),
            Err(StegError::Capacity { needed: 51, available: 48, .. })
        ));

        let cover = Bitmap::create(5, 4, false);
        let stego = encode(&cover, b"hi", Some(1)).unwrap();
        assert_eq!(decode(&stego).unwrap(), b"hi");

        // 'h' = 0x68，紧跟在 3 个选择器字节和 32 个长度字节之后
        let bits: Vec<u8> = stego.as_bytes()[35..43].to_vec();
        assert_eq!(bits, [0, 1, 1, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn tiny_cover_rejects_large_payload() {
        let cover = Bitmap::create(2, 2, false);
        assert_eq!(cover.capacity_bytes(), 12);
        let payload = [0u8; 50];
        assert!(matches!(
            encode(&cover, &payload, None),
            Err(StegError::Capacity { .. })
        ));
        for bits in 1..=7 {
            assert!(matches!(
                encode(&cover, &payload, Some(bits)),
                Err(StegError::Capacity { .. })
            ));
        }
    }

    #[test]
    fn selector_reads_back_five() {
        let stego = encode(&cover(8, 8, false, 0xFF), b"anything at all", Some(5)).unwrap();
        let selector: Vec<u8> = stego.as_bytes()[..3].iter().map(|b| b & 1).collect();
        assert_eq!(selector, [1, 0, 1]);
    }

    #[test]
    fn round_trip_every_width() {
        let payload: Vec<u8> = (0..=255u8).rev().chain(0..=255).collect();
        let cover = cover(40, 30, true, 0xA5);
        for bits in 1..=8 {
            let stego = encode(&cover, &payload, Some(bits)).unwrap();
            assert_eq!(decode(&stego).unwrap(), payload, "width {bits}");
        }
    }

    #[test]
    fn encode_does_not_touch_cover() {
        let cover = cover(4, 4, false, 0x5A);
        let before = cover.clone();
        let stego = encode(&cover, b"x", Some(3)).unwrap();
        assert_eq!(cover, before);
        assert_ne!(stego, cover);
    }

    #[test]
    fn high_bits_are_preserved() {
        let cover = cover(10, 10, false, 0b1011_0110);
        for bits in 1..=7u8 {
            let stego = encode(&cover, b"preserve", Some(bits)).unwrap();
            let keep = !low_mask(bits);
            let used = required_bytes(8, BitWidth(bits)) as usize;
            for (i, (&a, &b)) in cover.as_bytes()[3..used]
                .iter()
                .zip(&stego.as_bytes()[3..used])
                .enumerate()
            {
                assert_eq!(a & keep, b & keep, "width {bits}, byte {i}");
            }
            assert_eq!(&stego.as_bytes()[used..], &cover.as_bytes()[used..]);
        }
    }

    #[test]
    fn exact_capacity_boundary() {
        let cover = cover(5, 5, false, 0); // 75 bytes
        for bits in 1..=8 {
            let width = BitWidth(bits);
            let max = max_payload_len(cover.capacity_bytes(), width);
            assert!(required_bytes(max, width) <= 75);
            assert!(required_bytes(max + 1, width) > 75);

            let payload = vec![0xC3; max];
            let stego = encode(&cover, &payload, Some(bits)).unwrap();
            assert_eq!(decode(&stego).unwrap(), payload);

            let too_big = vec![0xC3; max + 1];
            assert!(matches!(
                encode(&cover, &too_big, Some(bits)),
                Err(StegError::Capacity { .. })
            ));
        }
    }

    #[test]
    fn truncated_stream_is_reported() {
        // 选择器读出 7 位宽，长度前缀远大于图像容量
        let stego = cover(6, 6, false, 0x01);
        assert!(matches!(
            decode(&stego),
            Err(StegError::Format(FormatError::TruncatedStream { .. }))
        ));

        let too_small = Bitmap::create(1, 1, false);
        assert!(matches!(
            decode(&too_small),
            Err(StegError::Format(FormatError::TruncatedStream { .. }))
        ));
    }

    #[test]
    fn bit_order_across_image_bytes() {
        // 3 位宽时，0xFF 0x00 0x00 0x01 打包为比特流
        // 111 111 110 000 000 000 000 000 000 000 01(0)
        let mut bytes = [0u8; 11];
        let width = BitWidth(3);
        let mut writer = LsbWriter::new(&mut bytes, width);
        writer.write_bytes(&[0xFF, 0x00, 0x00, 0x01]);
        assert_eq!(writer.bytes_used(), 11);
        assert_eq!(bytes, [7, 7, 6, 0, 0, 0, 0, 0, 0, 0, 2]);

        let mut reader = LsbReader::new(&bytes, width);
        let mut out = [0u8; 4];
        reader.read_bytes(&mut out).unwrap();
        assert_eq!(out, [0xFF, 0x00, 0x00, 0x01]);
    }
}
