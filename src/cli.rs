//! # 命令行接口模块
//!
//! 使用 `clap` 定义了程序的命令行结构，包括子命令和参数。
//! 所有用户通过命令行与程序交互的入口点都在此模块中定义。

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// 将任意文件隐藏在 24/32 位 BMP 图像像素字节的最低 1~8 位中，或从中恢复。
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "将任意文件隐藏在 24/32 位 BMP 图像像素字节的最低 1~8 位中，或从中恢复。未指定位数时自动选择能容纳数据的最小位数。"
)]
pub struct Cli {
    /// 输出更多日志 (-v 信息, -vv 调试, -vvv 跟踪)。
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令：hide (隐藏)、recover (恢复) 和 inspect (查看)。
#[derive(Parser, Debug)]
pub enum Commands {
    /// 将数据文件隐藏到 BMP 图像中。
    Hide(HideArgs),

    /// 从经过隐写的 BMP 图像中恢复隐藏的数据。
    Recover(RecoverArgs),

    /// 打印 BMP 图像的头部信息以及各个位数下的容量。
    Inspect(InspectArgs),
}

/// 'hide' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct HideArgs {
    /// 用作载体的 BMP 图像路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 要隐藏的数据文件路径，可以是任意类型的文件。
    #[arg(short, long)]
    pub data: PathBuf,

    /// 结果图像的输出路径，默认为输入图像旁边的 `doctored_<名称>.bmp`。
    #[arg(short = 'o', long)]
    pub dest: Option<PathBuf>,

    /// 每个像素字节使用的最低位数 (1~8)，省略时自动选择。
    #[arg(short, long)]
    pub bits: Option<u8>,

    /// 输出文件已存在时覆盖它。
    #[arg(short, long)]
    pub force: bool,
}

/// 'recover' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct RecoverArgs {
    /// 已隐藏数据的 BMP 图像路径。
    #[arg(short, long)]
    pub image: PathBuf,

    /// 恢复数据的输出路径，默认为输入图像旁边的 `recovered_<名称>.bin`。
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// 输出文件已存在时覆盖它。
    #[arg(short, long)]
    pub force: bool,
}

/// 'inspect' 命令所需的参数。
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// 要查看的 BMP 图像路径。
    #[arg(short, long)]
    pub image: PathBuf,
}

impl Cli {
    /// 将 `-v` 的次数映射为日志级别。
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
