// 该文件是 Kanshuo （看说） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use kanshuo::overlay::DEFAULT_FONT_SIZE;

/// Kanshuo 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像（jpg、jpeg、png）
  #[arg(long, value_name = "FILE")]
  pub input: PathBuf,

  /// 绘制检测结果后的图像保存路径
  #[arg(long, value_name = "FILE")]
  pub output: PathBuf,

  /// 朗读音频保存路径；不指定时保留在音频目录中
  #[arg(long, value_name = "FILE")]
  pub audio: Option<PathBuf>,

  /// 检测模型
  /// 支持:
  /// - hf://<owner>/<model>?threshold=0.5&endpoint=<url>
  #[arg(long, value_name = "URL", default_value = "hf://facebook/detr-resnet-50")]
  pub detector: Url,

  /// 语音合成
  /// 支持:
  /// - gtts://<lang>?tld=com&slow=false
  /// - hf-tts://<owner>/<model>?endpoint=<url>
  #[arg(long, value_name = "URL", default_value = "gtts://en")]
  pub tts: Url,

  /// Hugging Face 访问令牌
  #[arg(long, env = "HF_TOKEN", hide_env_values = true, value_name = "TOKEN")]
  pub hf_token: Option<String>,

  /// 单次请求超时（秒）
  #[arg(long, default_value = "120", value_name = "SECS")]
  pub timeout: u64,

  /// 合成音频的存放目录，默认为系统临时目录
  #[arg(long, value_name = "DIR")]
  pub audio_dir: Option<PathBuf>,

  /// 优先使用的字体文件，可多次指定；都不可用时使用内置点阵字体
  #[arg(long = "font", value_name = "FILE")]
  pub fonts: Vec<PathBuf>,

  /// 标签字体大小（像素）
  #[arg(long, default_value_t = DEFAULT_FONT_SIZE, value_name = "PX")]
  pub font_size: f32,

  /// 在输出图像旁写入检测记录（.txt）
  #[arg(long)]
  pub record: bool,
}
