// 该文件是 Kanshuo （看说） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use kanshuo::{
  Pipeline,
  backend::RemoteOptions,
  detection::DetectorWrapper,
  input::read_image,
  overlay::{LabelFont, Overlay, Record, default_font_candidates},
  speech::SynthesizerWrapper,
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入图像: {}", args.input.display());
  info!("输出图像: {}", args.output.display());
  info!("检测模型: {}", args.detector);
  info!("语音合成: {}", args.tts);

  let options = RemoteOptions {
    token: args.hf_token.clone(),
    timeout: Duration::from_secs(args.timeout),
    audio_dir: args
      .audio_dir
      .clone()
      .unwrap_or_else(std::env::temp_dir),
  };

  let detector = DetectorWrapper::build(&args.detector, &options)?;
  let synthesizer = SynthesizerWrapper::build(&args.tts, &options)?;

  let mut fonts = args.fonts.clone();
  fonts.extend(default_font_candidates());
  let overlay = Overlay::new(LabelFont::load(&fonts, args.font_size));

  let pipeline = Pipeline::new(detector, overlay, synthesizer);

  let image = read_image(&args.input)?;
  let narration = pipeline.process(&image)?;

  narration.annotated.save(&args.output)?;
  warn!("保存图像到文件: {}", args.output.display());

  if args.record {
    Record::record(&narration.detections, &args.output)?;
    info!("检测记录已写入: {}", args.output.with_extension("txt").display());
  }

  let (_, description, audio) = narration.into_parts();
  let audio_path = match &args.audio {
    Some(path) => audio.persist(path)?,
    None => audio.keep()?,
  };
  warn!("保存音频到文件: {}", audio_path.display());

  println!("{}", description);
  Ok(())
}
