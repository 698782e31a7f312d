// 该文件是 Kanshuo （看说） 项目的一部分。
// src/overlay/font.rs - 标签字体
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

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use tracing::{debug, info, warn};

pub const DEFAULT_FONT_SIZE: f32 = 20.0;
pub const MAX_FONT_SIZE: f32 = 1024.0;
const BITMAP_GLYPH_SIZE: u32 = 8;

/// 常见系统中的无衬线字体位置
pub fn default_font_candidates() -> Vec<PathBuf> {
  [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "arial.ttf",
  ]
  .iter()
  .map(PathBuf::from)
  .collect()
}

/// 标签文字所用字体：可缩放字体或内置点阵字体
pub enum LabelFont {
  Scalable { font: FontVec, scale: PxScale },
  Bitmap { factor: u32 },
}

impl LabelFont {
  /// 依次尝试候选字体文件，全部失败时退回内置点阵字体，不会返回错误
  pub fn load<P: AsRef<Path>>(candidates: &[P], size: f32) -> Self {
    let size = if !(size.is_finite() && size > 0.0) {
      warn!("字体大小 {} 无效, 使用默认值 {}", size, DEFAULT_FONT_SIZE);
      DEFAULT_FONT_SIZE
    } else if size > MAX_FONT_SIZE {
      warn!("字体大小 {} 过大, 限制为 {}", size, MAX_FONT_SIZE);
      MAX_FONT_SIZE
    } else {
      size
    };

    for path in candidates {
      let path = path.as_ref();
      match Self::scalable(path, size) {
        Some(font) => {
          info!("使用字体: {}", path.display());
          return font;
        }
        None => debug!("字体不可用: {}", path.display()),
      }
    }

    warn!("没有可用的字体文件, 使用内置点阵字体");
    Self::bitmap(size)
  }

  fn scalable(path: &Path, size: f32) -> Option<Self> {
    let data = std::fs::read(path).ok()?;
    let font = FontVec::try_from_vec(data).ok()?;
    Some(LabelFont::Scalable {
      font,
      scale: PxScale::from(size),
    })
  }

  /// 8x8 点阵字体，按整数倍放大到接近 `size` 的高度
  pub fn bitmap(size: f32) -> Self {
    let factor = (size.min(MAX_FONT_SIZE) / BITMAP_GLYPH_SIZE as f32).round();
    let factor = if factor.is_finite() && factor >= 1.0 {
      factor as u32
    } else {
      1
    };
    LabelFont::Bitmap { factor }
  }

  pub fn is_bitmap(&self) -> bool {
    matches!(self, LabelFont::Bitmap { .. })
  }

  /// 文本绘制后的宽高（像素）
  pub fn text_size(&self, text: &str) -> (u32, u32) {
    match self {
      LabelFont::Scalable { font, scale } => {
        let (width, _) = text_size(*scale, font, text);
        (width, scale.y.ceil() as u32)
      }
      LabelFont::Bitmap { factor } => {
        let glyph = BITMAP_GLYPH_SIZE * factor;
        let count = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        (count.saturating_mul(glyph), glyph)
      }
    }
  }

  pub fn draw_text(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, text: &str) {
    match self {
      LabelFont::Scalable { font, scale } => {
        draw_text_mut(image, color, x, y, *scale, font, text);
      }
      LabelFont::Bitmap { factor } => {
        let factor = *factor;
        let step = (BITMAP_GLYPH_SIZE * factor) as i32;
        for (i, ch) in text.chars().enumerate() {
          let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
          let origin_x = x.saturating_add((i as i32).saturating_mul(step));
          for (row, bits) in glyph.iter().enumerate() {
            for col in 0..BITMAP_GLYPH_SIZE {
              // 最低位为最左侧像素
              if bits & (1u8 << col) == 0 {
                continue;
              }
              let px = origin_x.saturating_add((col * factor) as i32);
              let py = y + (row as u32 * factor) as i32;
              draw_filled_rect_mut(image, Rect::at(px, py).of_size(factor, factor), color);
            }
          }
        }
      }
    }
  }
}
