// 该文件是 Kanshuo （看说） 项目的一部分。
// src/speech/hf_tts.rs - Hugging Face 推理服务语音合成
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

use std::{path::PathBuf, time::Duration};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  backend::{self, BackendError, DEFAULT_TIMEOUT},
  speech::{AudioArtifact, AudioFormat, SynthesisError, Synthesize, non_empty_text},
};

const HF_TTS_SCHEME: &str = "hf-tts";
const HF_INFERENCE_ENDPOINT: &str = "https://router.huggingface.co/hf-inference/models";

#[derive(Serialize)]
struct SynthesisRequest<'a> {
  inputs: &'a str,
}

#[derive(Deserialize)]
struct ServiceError {
  error: String,
}

pub struct HfSynthesizerBuilder {
  model: String,
  endpoint: String,
  token: Option<String>,
  timeout: Duration,
  audio_dir: PathBuf,
}

impl FromUrlWithScheme for HfSynthesizerBuilder {
  const SCHEME: &'static str = HF_TTS_SCHEME;
}

impl FromUrl for HfSynthesizerBuilder {
  type Error = BackendError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    BackendError::check_scheme(url, Self::SCHEME)?;

    Ok(HfSynthesizerBuilder {
      model: backend::model_id(url)?,
      endpoint: backend::query_param(url, "endpoint")
        .unwrap_or_else(|| HF_INFERENCE_ENDPOINT.to_string()),
      token: None,
      timeout: DEFAULT_TIMEOUT,
      audio_dir: std::env::temp_dir(),
    })
  }
}

impl HfSynthesizerBuilder {
  pub fn token(mut self, token: Option<String>) -> Self {
    self.token = token;
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn audio_dir(mut self, audio_dir: PathBuf) -> Self {
    self.audio_dir = audio_dir;
    self
  }

  pub fn build(self) -> Result<HfSynthesizer, BackendError> {
    let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), self.model);
    info!("语音合成模型: {}, 服务地址: {}", self.model, url);
    Ok(HfSynthesizer {
      client: backend::http_client(self.timeout)?,
      url,
      token: self.token,
      audio_dir: self.audio_dir,
    })
  }
}

/// 通过 Hugging Face 推理接口调用语音合成模型（如 VITS）
pub struct HfSynthesizer {
  client: Client,
  url: String,
  token: Option<String>,
  audio_dir: PathBuf,
}

impl HfSynthesizer {
  pub fn url(&self) -> &str {
    &self.url
  }
}

fn error_message(body: &[u8]) -> String {
  match serde_json::from_slice::<ServiceError>(body) {
    Ok(ServiceError { error }) => error,
    Err(_) => String::from_utf8_lossy(body).chars().take(200).collect(),
  }
}

/// 先看 `Content-Type`，未知时再看文件头
fn audio_format(content_type: Option<&str>, body: &[u8]) -> AudioFormat {
  match content_type.map(AudioFormat::from_mime) {
    Some(format) if format != AudioFormat::Unknown => format,
    _ => AudioFormat::sniff(body),
  }
}

impl Synthesize for HfSynthesizer {
  fn synthesize(&self, text: &str) -> Result<AudioArtifact, SynthesisError> {
    let text = non_empty_text(text)?;

    let mut request = self
      .client
      .post(&self.url)
      .json(&SynthesisRequest { inputs: text });
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request.send()?;
    let status = response.status();
    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(str::to_string);
    let bytes = response.bytes()?;

    if !status.is_success() {
      let message = error_message(&bytes);
      error!("合成服务返回错误 {}: {}", status, message);
      return Err(SynthesisError::Status {
        status: status.as_u16(),
        message,
      });
    }
    if content_type
      .as_deref()
      .is_some_and(|t| t.starts_with("application/json"))
    {
      return Err(SynthesisError::Service(error_message(&bytes)));
    }

    let format = audio_format(content_type.as_deref(), &bytes);
    debug!("收到音频 {:?}, 大小: {} 字节", format, bytes.len());
    AudioArtifact::write(&self.audio_dir, format, &bytes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builder_from_url() {
    let url = Url::parse("hf-tts://kakao-enterprise/vits-ljs").unwrap();
    let synthesizer = HfSynthesizerBuilder::from_url(&url).unwrap().build().unwrap();
    assert_eq!(
      synthesizer.url(),
      "https://router.huggingface.co/hf-inference/models/kakao-enterprise/vits-ljs"
    );
  }

  #[test]
  fn builder_requires_model() {
    let url = Url::parse("hf-tts://").unwrap();
    assert!(matches!(
      HfSynthesizerBuilder::from_url(&url),
      Err(BackendError::MissingModel(_))
    ));
  }

  #[test]
  fn error_messages() {
    assert_eq!(
      error_message(br#"{"error":"Model is loading"}"#),
      "Model is loading"
    );
    assert_eq!(error_message(b"Bad Gateway"), "Bad Gateway");
  }

  #[test]
  fn format_from_header_then_body() {
    assert_eq!(audio_format(Some("audio/flac"), b"RIFF"), AudioFormat::Flac);
    assert_eq!(
      audio_format(Some("application/octet-stream"), b"RIFF\0\0\0\0WAVE"),
      AudioFormat::Wav
    );
    assert_eq!(audio_format(None, b"ID3"), AudioFormat::Mp3);
  }

  #[test]
  fn empty_text_fails_before_any_request() {
    let url = Url::parse("hf-tts://kakao-enterprise/vits-ljs").unwrap();
    let synthesizer = HfSynthesizerBuilder::from_url(&url).unwrap().build().unwrap();
    assert!(matches!(synthesizer.synthesize(""), Err(SynthesisError::EmptyText)));
  }
}
