// 该文件是 Kanshuo （看说） 项目的一部分。
// src/overlay.rs - 目标检测结果可视化
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

use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut},
  rect::Rect,
};
use thiserror::Error;
use tracing::debug;

use crate::detection::{BoundingBox, Detection};

mod font;
pub use self::font::{DEFAULT_FONT_SIZE, LabelFont, MAX_FONT_SIZE, default_font_candidates};

// 绘制常量
const STROKE_WIDTH: u32 = 3;
const LABEL_PADDING: u32 = 2;
const OUTLINE_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色

#[derive(Error, Debug)]
pub enum RenderError {
  #[error("检测框 #{index} ({label}) 坐标无效: {bbox:?}")]
  InvalidBox {
    index: usize,
    label: String,
    bbox: BoundingBox,
  },
}

/// 一个检测结果在图像上绘制的区域
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRegion {
  /// 检测框
  pub frame: Rect,
  /// 标签背景
  pub tag: Rect,
  /// 标签文字
  pub text: String,
}

/// 绘制了检测结果的图像副本
#[derive(Debug, Clone)]
pub struct AnnotatedImage {
  pub image: RgbImage,
  pub regions: Vec<OverlayRegion>,
}

impl AnnotatedImage {
  pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(image::ImageError::IoError)?;
    }
    self.image.save(path)
  }
}

pub struct Overlay {
  font: LabelFont,
  stroke_width: u32,
  label_padding: u32,
  outline_color: Rgb<u8>,
  text_color: Rgb<u8>,
}

impl Default for Overlay {
  fn default() -> Self {
    Self::new(LabelFont::load(&default_font_candidates(), DEFAULT_FONT_SIZE))
  }
}

impl Overlay {
  pub fn new(font: LabelFont) -> Self {
    Self {
      font,
      stroke_width: STROKE_WIDTH,
      label_padding: LABEL_PADDING,
      outline_color: Rgb(OUTLINE_COLOR),
      text_color: Rgb(TEXT_COLOR),
    }
  }

  pub fn font(&self) -> &LabelFont {
    &self.font
  }

  /// 在图像副本上绘制全部检测框与标签，原图不变
  pub fn render(
    &self,
    image: &RgbImage,
    detections: &[Detection],
  ) -> Result<AnnotatedImage, RenderError> {
    let mut canvas = image.clone();
    let mut regions = Vec::with_capacity(detections.len());

    for (index, detection) in detections.iter().enumerate() {
      if !detection.bbox.is_valid() {
        return Err(RenderError::InvalidBox {
          index,
          label: detection.label.clone(),
          bbox: detection.bbox,
        });
      }
      regions.push(self.draw_bbox_with_label(&mut canvas, detection));
    }

    debug!("绘制了 {} 个检测框", regions.len());
    Ok(AnnotatedImage {
      image: canvas,
      regions,
    })
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, detection: &Detection) -> OverlayRegion {
    let frame = self.frame_rect(image, &detection.bbox);

    // 边框向内加粗
    for t in 0..self.stroke_width {
      let (w, h) = (frame.width(), frame.height());
      if w <= 2 * t || h <= 2 * t {
        break;
      }
      let rect = Rect::at(frame.left() + t as i32, frame.top() + t as i32)
        .of_size(w - 2 * t, h - 2 * t);
      draw_hollow_rect_mut(image, rect, self.outline_color);
    }

    // 标签放在检测框左上角
    let text = format!("{} {:.2}", detection.label, detection.score);
    let (text_width, text_height) = self.font.text_size(&text);
    let tag_x = frame.left().max(0);
    let tag_y = frame.top().max(0);
    // 标签不超过图像尺寸
    let padding = 2 * self.label_padding;
    let tag = Rect::at(tag_x, tag_y).of_size(
      text_width.saturating_add(padding).min(image.width().max(1)),
      text_height.saturating_add(padding).min(image.height().max(1)),
    );
    draw_filled_rect_mut(image, tag, self.outline_color);
    self.font.draw_text(
      image,
      self.text_color,
      tag_x + self.label_padding as i32,
      tag_y + self.label_padding as i32,
      &text,
    );

    OverlayRegion { frame, tag, text }
  }

  /// 取整到像素并限制在图像附近，保证可见部分与原坐标一致
  fn frame_rect(&self, image: &RgbImage, bbox: &BoundingBox) -> Rect {
    let margin = self.stroke_width as f32;
    let (w, h) = (image.width() as f32, image.height() as f32);
    let x_min = bbox.xmin.floor().clamp(-margin, w + margin) as i32;
    let y_min = bbox.ymin.floor().clamp(-margin, h + margin) as i32;
    let x_max = bbox.xmax.ceil().clamp(-margin, w + margin) as i32;
    let y_max = bbox.ymax.ceil().clamp(-margin, h + margin) as i32;

    Rect::at(x_min, y_min).of_size(
      (x_max - x_min).max(1) as u32,
      (y_max - y_min).max(1) as u32,
    )
  }
}

/// 将检测结果写为文本记录，每行 `label, score, xmin, ymin, xmax, ymax`
pub struct Record;

impl Record {
  pub fn format(detections: &[Detection]) -> String {
    detections
      .iter()
      .map(|d| {
        format!(
          "{}, {:.4}, {:.1}, {:.1}, {:.1}, {:.1}",
          d.label, d.score, d.bbox.xmin, d.bbox.ymin, d.bbox.xmax, d.bbox.ymax
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  /// 记录写在图像旁，扩展名为 `.txt`
  pub fn record(detections: &[Detection], image_path: &Path) -> Result<(), std::io::Error> {
    std::fs::write(image_path.with_extension("txt"), Self::format(detections))
  }
}
