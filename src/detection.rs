// 该文件是 Kanshuo （看说） 项目的一部分。
// src/detection.rs - 目标检测模型
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

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::backend::{BackendError, RemoteOptions};

/// 检测框，像素坐标 [x_min, y_min, x_max, y_max]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub xmin: f32,
  pub ymin: f32,
  pub xmax: f32,
  pub ymax: f32,
}

impl BoundingBox {
  pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
    Self {
      xmin,
      ymin,
      xmax,
      ymax,
    }
  }

  /// 坐标有限且 min < max
  pub fn is_valid(&self) -> bool {
    [self.xmin, self.ymin, self.xmax, self.ymax]
      .iter()
      .all(|v| v.is_finite())
      && self.xmin < self.xmax
      && self.ymin < self.ymax
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub label: String,
  pub score: f32,
  #[serde(rename = "box")]
  pub bbox: BoundingBox,
}

#[derive(Error, Debug)]
pub enum ModelInvocationError {
  #[error("图像编码错误: {0}")]
  Encode(#[from] image::ImageError),
  #[cfg(feature = "reqwest")]
  #[error("请求检测服务失败: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("检测服务返回状态 {status}: {message}")]
  Status { status: u16, message: String },
  #[error("检测服务错误: {0}")]
  Service(String),
  #[error("检测结果解析失败: {0}")]
  Decode(#[from] serde_json::Error),
}

/// 目标检测模型
///
/// 返回结果的顺序即模型输出的顺序，不保证按位置或置信度排序。
#[cfg_attr(test, mockall::automock)]
pub trait Detect {
  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, ModelInvocationError>;
}

impl<T: Detect + ?Sized> Detect for Box<T> {
  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, ModelInvocationError> {
    (**self).detect(image)
  }
}

#[cfg(feature = "hf_detector")]
mod hf_detector;
#[cfg(feature = "hf_detector")]
pub use self::hf_detector::{HfDetector, HfDetectorBuilder};

pub enum DetectorWrapper {
  #[cfg(feature = "hf_detector")]
  HuggingFace(HfDetector),
}

impl DetectorWrapper {
  /// 按 URL 方案选择检测后端
  pub fn build(url: &Url, options: &RemoteOptions) -> Result<Self, BackendError> {
    #[cfg(feature = "hf_detector")]
    {
      use crate::{FromUrl, FromUrlWithScheme};

      if url.scheme() == HfDetectorBuilder::SCHEME {
        let detector = HfDetectorBuilder::from_url(url)?
          .token(options.token.clone())
          .timeout(options.timeout)
          .build()?;
        return Ok(DetectorWrapper::HuggingFace(detector));
      }
    }

    let _ = options;
    Err(BackendError::Unsupported(url.scheme().to_string()))
  }
}

impl Detect for DetectorWrapper {
  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, ModelInvocationError> {
    match self {
      #[cfg(feature = "hf_detector")]
      DetectorWrapper::HuggingFace(detector) => detector.detect(image),
      #[allow(unreachable_patterns)]
      _ => unreachable!("未启用任何检测后端"),
    }
  }
}
