// 该文件是 Kanshuo （看说） 项目的一部分。
// src/input.rs - 图像文件输入
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

use std::path::Path;

use image::{ImageFormat, ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};

/// 支持上传的图像格式
pub const SUPPORTED_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

#[derive(Error, Debug)]
pub enum InputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("不支持的图像格式: {0}")]
  UnsupportedFormat(String),
}

/// 读取并解码图像文件，统一转为 RGB
pub fn read_image(path: &Path) -> Result<RgbImage, InputError> {
  let reader = ImageReader::open(path)?.with_guessed_format()?;
  match reader.format() {
    Some(format) if SUPPORTED_FORMATS.contains(&format) => {}
    other => {
      let name = other
        .map(|f| format!("{:?}", f))
        .unwrap_or_else(|| "未知".to_string());
      error!("无法读取 {}: 不支持的格式 {}", path.display(), name);
      return Err(InputError::UnsupportedFormat(name));
    }
  }

  let image = reader.decode()?.to_rgb8();
  info!(
    "读取图像: {} ({}x{})",
    path.display(),
    image.width(),
    image.height()
  );
  Ok(image)
}
