//! # 命令处理逻辑模块
//!
//! 包含处理 `hide`、`recover` 和 `inspect` 子命令的高级业务逻辑。
//! 本模块负责协调文件 I/O、调用核心隐写算法以及向用户报告结果。

use crate::atomic_file::write_atomically;
use crate::bitmap::Bitmap;
use crate::cli::{HideArgs, InspectArgs, RecoverArgs};
use crate::constants::MAX_BIT_WIDTH;
use crate::steganography::{BitWidth, decode, encode, max_payload_len};
use anyhow::{Context, Result};
use colored::Colorize;
use log::info;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 处理 'Hide' 命令的执行逻辑。
///
/// 负责读取载体图像和数据文件、调用隐写核心函数生成新的图像，
/// 最后将结果写入目标图像文件。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 目标文件已存在且未指定 `--force`。
/// * 无法读取输入的图像或数据文件，或图像不是受支持的 BMP。
/// * 指定的位数不在 1~8 之间，或图像没有足够的空间。
/// * 无法写入到目标图像文件。
pub fn handle_hide(args: HideArgs) -> Result<()> {
    let dest = args
        .dest
        .clone()
        .unwrap_or_else(|| default_path(&args.image, "doctored_", "bmp"));
    ensure_writable(&dest, args.force)?;

    let cover = Bitmap::load(&args.image).with_context(|| {
        format!(
            "Unable to read image file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let data = fs::read(&args.data).with_context(|| {
        format!(
            "Unable to read data file: {}",
            args.data.to_string_lossy().red().bold()
        )
    })?;

    info!(
        "Cover image is {}x{} at {} bpp, {} bytes of capacity",
        cover.width(),
        cover.height(),
        cover.bits_per_pixel(),
        cover.capacity_bytes()
    );

    let stego = encode(&cover, &data, args.bits).with_context(|| {
        format!(
            "Failed to hide {} bytes in {}",
            data.len().to_string().red().bold(),
            args.image.to_string_lossy().red().bold()
        )
    })?;

    stego.store(&dest).with_context(|| {
        format!(
            "Unable to write to target image file: {}",
            dest.to_string_lossy().red().bold()
        )
    })?;

    println!(
        "The data has been successfully hidden and saved: {}",
        dest.to_string_lossy().green().bold()
    );

    Ok(())
}

/// 处理 'Recover' 命令的执行逻辑。
///
/// 负责读取经过隐写的图像文件、调用恢复核心函数取回隐藏的数据，
/// 最后将数据写入目标文件。
///
/// # Errors
///
/// 如果发生以下任一情况，将返回错误：
/// * 目标文件已存在且未指定 `--force`。
/// * 无法读取输入的图像文件，或图像不是受支持的 BMP。
/// * 图像中的隐写数据流不完整。
/// * 无法写入到目标文件。
pub fn handle_recover(args: RecoverArgs) -> Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_path(&args.image, "recovered_", "bin"));
    ensure_writable(&output, args.force)?;

    let stego = Bitmap::load(&args.image).with_context(|| {
        format!(
            "Unable to read image file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    let data = decode(&stego).with_context(|| {
        format!(
            "Failed to recover hidden data from '{}'. \nThe image may not contain hidden data or is corrupted.",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    write_atomically(&output, |writer| writer.write_all(&data)).with_context(|| {
        format!(
            "Unable to write to target file: {}",
            output.to_string_lossy().red().bold()
        )
    })?;

    println!(
        "{} bytes have been successfully recovered and saved: {}",
        data.len(),
        output.to_string_lossy().green().bold()
    );
    Ok(())
}

/// 处理 'Inspect' 命令：打印头部信息和每个位数下可隐藏的最大字节数。
pub fn handle_inspect(args: InspectArgs) -> Result<()> {
    let bitmap = Bitmap::load(&args.image).with_context(|| {
        format!(
            "Unable to read image file: {}",
            args.image.to_string_lossy().red().bold()
        )
    })?;

    println!("{bitmap}");
    println!();
    println!("Capacity ({} image bytes):", bitmap.capacity_bytes());
    for bits in 1..=MAX_BIT_WIDTH {
        let width = BitWidth::new(bits)?;
        println!(
            "  {} bits: {} bytes",
            bits,
            max_payload_len(bitmap.capacity_bytes(), width)
                .to_string()
                .green()
        );
    }
    Ok(())
}

/// 在输入文件旁边生成默认输出路径，例如 `dir/cat.bmp` -> `dir/doctored_cat.bmp`。
pub fn default_path(input: &Path, prefix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{prefix}{stem}.{extension}"))
}

fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    anyhow::ensure!(
        force || !path.exists(),
        "Output file already exists: {}. \nUse --force to overwrite it.",
        path.to_string_lossy().red().bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_sit_next_to_input() {
        let input = Path::new("some/dir/cat.bmp");
        assert_eq!(
            default_path(input, "doctored_", "bmp"),
            Path::new("some/dir/doctored_cat.bmp")
        );
        assert_eq!(
            default_path(input, "recovered_", "bin"),
            Path::new("some/dir/recovered_cat.bin")
        );
    }
}
