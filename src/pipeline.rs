// 该文件是 Kanshuo （看说） 项目的一部分。
// src/pipeline.rs - 检测、描述、绘制与朗读流程
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

use std::time::Instant;

use image::RgbImage;
use thiserror::Error;
use tracing::info;

use crate::{
  describe::describe,
  detection::{Detect, Detection, ModelInvocationError},
  overlay::{AnnotatedImage, Overlay, RenderError},
  speech::{AudioArtifact, SynthesisError, Synthesize},
};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error(transparent)]
  Detection(#[from] ModelInvocationError),
  #[error(transparent)]
  Render(#[from] RenderError),
  #[error(transparent)]
  Synthesis(#[from] SynthesisError),
}

/// 一次处理的全部结果
#[derive(Debug)]
pub struct Narration {
  pub detections: Vec<Detection>,
  pub annotated: AnnotatedImage,
  pub description: String,
  pub audio: AudioArtifact,
}

impl Narration {
  pub fn into_parts(self) -> (AnnotatedImage, String, AudioArtifact) {
    (self.annotated, self.description, self.audio)
  }
}

/// 检测 → 绘制 → 描述 → 朗读
///
/// 任一步失败即返回该错误，不重试，也不返回部分结果。
pub struct Pipeline<D, S> {
  detector: D,
  overlay: Overlay,
  synthesizer: S,
}

impl<D: Detect, S: Synthesize> Pipeline<D, S> {
  pub fn new(detector: D, overlay: Overlay, synthesizer: S) -> Self {
    Self {
      detector,
      overlay,
      synthesizer,
    }
  }

  pub fn detector(&self) -> &D {
    &self.detector
  }

  pub fn synthesizer(&self) -> &S {
    &self.synthesizer
  }

  pub fn process(&self, image: &RgbImage) -> Result<Narration, PipelineError> {
    info!("开始检测, 图像大小 {}x{}", image.width(), image.height());
    let now = Instant::now();
    let detections = self.detector.detect(image)?;
    info!(
      "检测完成, 共 {} 个目标, 耗时: {:.2?}",
      detections.len(),
      now.elapsed()
    );

    let annotated = self.overlay.render(image, &detections)?;
    let description = describe(&detections);
    info!("描述: {}", description);

    let now = Instant::now();
    let audio = self.synthesizer.synthesize(&description)?;
    info!(
      "语音合成完成: {}, 耗时: {:.2?}",
      audio.path().display(),
      now.elapsed()
    );

    Ok(Narration {
      detections,
      annotated,
      description,
      audio,
    })
  }
}
