// 该文件是 Kanshuo （看说） 项目的一部分。
// src/speech.rs - 语音合成
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

use std::{
  io::Write,
  path::{Path, PathBuf},
};

use chrono::Utc;
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::backend::{BackendError, RemoteOptions};

#[derive(Error, Debug)]
pub enum SynthesisError {
  #[error("待合成的文本为空")]
  EmptyText,
  #[error("合成服务没有返回音频数据")]
  EmptyAudio,
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[cfg(feature = "reqwest")]
  #[error("请求合成服务失败: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("合成服务返回状态 {status}: {message}")]
  Status { status: u16, message: String },
  #[error("合成服务错误: {0}")]
  Service(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
  Mp3,
  Wav,
  Flac,
  Unknown,
}

impl AudioFormat {
  pub fn extension(&self) -> &'static str {
    match self {
      AudioFormat::Mp3 => "mp3",
      AudioFormat::Wav => "wav",
      AudioFormat::Flac => "flac",
      AudioFormat::Unknown => "bin",
    }
  }

  /// 由 `Content-Type` 判断格式，忽略参数部分
  pub fn from_mime(mime: &str) -> Self {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match essence.as_str() {
      "audio/mpeg" | "audio/mp3" => AudioFormat::Mp3,
      "audio/wav" | "audio/wave" | "audio/x-wav" => AudioFormat::Wav,
      "audio/flac" | "audio/x-flac" => AudioFormat::Flac,
      _ => AudioFormat::Unknown,
    }
  }

  /// 由文件头判断格式
  pub fn sniff(data: &[u8]) -> Self {
    match data {
      [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => AudioFormat::Wav,
      [b'f', b'L', b'a', b'C', ..] => AudioFormat::Flac,
      [b'I', b'D', b'3', ..] => AudioFormat::Mp3,
      [0xFF, second, ..] if second & 0xE0 == 0xE0 => AudioFormat::Mp3,
      _ => AudioFormat::Unknown,
    }
  }
}

/// 合成得到的音频文件
///
/// 文件名在同一目录内唯一；句柄被丢弃时文件随之删除，
/// 需要保留时调用 [`AudioArtifact::persist`] 或 [`AudioArtifact::keep`]。
#[derive(Debug)]
pub struct AudioArtifact {
  path: TempPath,
  format: AudioFormat,
}

impl AudioArtifact {
  /// 在 `dir` 中以唯一文件名写入音频数据
  pub fn write(dir: &Path, format: AudioFormat, data: &[u8]) -> Result<Self, SynthesisError> {
    if data.is_empty() {
      return Err(SynthesisError::EmptyAudio);
    }
    std::fs::create_dir_all(dir)?;

    let prefix = format!("narration-{}-", Utc::now().format("%Y%m%d%H%M%S"));
    let suffix = format!(".{}", format.extension());
    let mut file = tempfile::Builder::new()
      .prefix(&prefix)
      .suffix(&suffix)
      .tempfile_in(dir)?;
    file.write_all(data)?;
    file.flush()?;

    let path = file.into_temp_path();
    debug!(
      "音频已写入: {}, 大小: {:.2} KB",
      path.display(),
      data.len() as f64 / 1024.0
    );
    Ok(Self { path, format })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn format(&self) -> AudioFormat {
    self.format
  }

  /// 移动到指定位置并取消自动删除
  pub fn persist<P: AsRef<Path>>(self, to: P) -> Result<PathBuf, std::io::Error> {
    let to = to.as_ref();
    if let Some(parent) = to.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    match self.path.persist(to) {
      Ok(()) => Ok(to.to_path_buf()),
      Err(e) => {
        // 跨文件系统时无法重命名，改为复制；临时文件随 TempPath 删除
        warn!("无法移动音频文件 ({}), 改为复制", e.error);
        std::fs::copy(&e.path, to)?;
        Ok(to.to_path_buf())
      }
    }
  }

  /// 保留在原位置
  pub fn keep(self) -> Result<PathBuf, std::io::Error> {
    self.path.keep().map_err(|e| e.error)
  }
}

/// 语音合成模型
#[cfg_attr(test, mockall::automock)]
pub trait Synthesize {
  fn synthesize(&self, text: &str) -> Result<AudioArtifact, SynthesisError>;
}

impl<T: Synthesize + ?Sized> Synthesize for Box<T> {
  fn synthesize(&self, text: &str) -> Result<AudioArtifact, SynthesisError> {
    (**self).synthesize(text)
  }
}

/// 去掉首尾空白，拒绝空文本
pub fn non_empty_text(text: &str) -> Result<&str, SynthesisError> {
  let text = text.trim();
  if text.is_empty() {
    return Err(SynthesisError::EmptyText);
  }
  Ok(text)
}

#[cfg(feature = "gtts_synthesizer")]
mod gtts;
#[cfg(feature = "gtts_synthesizer")]
pub use self::gtts::{GttsSynthesizer, GttsSynthesizerBuilder};

#[cfg(feature = "hf_synthesizer")]
mod hf_tts;
#[cfg(feature = "hf_synthesizer")]
pub use self::hf_tts::{HfSynthesizer, HfSynthesizerBuilder};

pub enum SynthesizerWrapper {
  #[cfg(feature = "gtts_synthesizer")]
  Gtts(GttsSynthesizer),
  #[cfg(feature = "hf_synthesizer")]
  HuggingFace(HfSynthesizer),
}

impl SynthesizerWrapper {
  /// 按 URL 方案选择合成后端
  pub fn build(url: &Url, options: &RemoteOptions) -> Result<Self, BackendError> {
    #[cfg(feature = "gtts_synthesizer")]
    {
      use crate::{FromUrl, FromUrlWithScheme};

      if url.scheme() == GttsSynthesizerBuilder::SCHEME {
        let synthesizer = GttsSynthesizerBuilder::from_url(url)?
          .timeout(options.timeout)
          .audio_dir(options.audio_dir.clone())
          .build()?;
        return Ok(SynthesizerWrapper::Gtts(synthesizer));
      }
    }
    #[cfg(feature = "hf_synthesizer")]
    {
      use crate::{FromUrl, FromUrlWithScheme};

      if url.scheme() == HfSynthesizerBuilder::SCHEME {
        let synthesizer = HfSynthesizerBuilder::from_url(url)?
          .token(options.token.clone())
          .timeout(options.timeout)
          .audio_dir(options.audio_dir.clone())
          .build()?;
        return Ok(SynthesizerWrapper::HuggingFace(synthesizer));
      }
    }

    let _ = options;
    Err(BackendError::Unsupported(url.scheme().to_string()))
  }
}

impl Synthesize for SynthesizerWrapper {
  fn synthesize(&self, text: &str) -> Result<AudioArtifact, SynthesisError> {
    match self {
      #[cfg(feature = "gtts_synthesizer")]
      SynthesizerWrapper::Gtts(synthesizer) => synthesizer.synthesize(text),
      #[cfg(feature = "hf_synthesizer")]
      SynthesizerWrapper::HuggingFace(synthesizer) => synthesizer.synthesize(text),
      #[allow(unreachable_patterns)]
      _ => unreachable!("未启用任何语音合成后端"),
    }
  }
}
