// 该文件是 Kanshuo （看说） 项目的一部分。
// src/detection/hf_detector.rs - Hugging Face 推理服务目标检测
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

use std::{io::Cursor, time::Duration};

use image::{ImageFormat, RgbImage};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  backend::{self, BackendError, DEFAULT_TIMEOUT},
  detection::{Detect, Detection, ModelInvocationError},
};

const HF_DETECTOR_SCHEME: &str = "hf";
const HF_INFERENCE_ENDPOINT: &str = "https://router.huggingface.co/hf-inference/models";
const HF_DEFAULT_THRESHOLD: f32 = 0.5;

/// 检测服务的返回：结果数组或错误对象
#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionResponse {
  Detections(Vec<Detection>),
  Error {
    error: String,
    #[serde(default)]
    estimated_time: Option<f32>,
  },
}

pub struct HfDetectorBuilder {
  model: String,
  endpoint: String,
  threshold: f32,
  token: Option<String>,
  timeout: Duration,
}

impl FromUrlWithScheme for HfDetectorBuilder {
  const SCHEME: &'static str = HF_DETECTOR_SCHEME;
}

impl FromUrl for HfDetectorBuilder {
  type Error = BackendError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    BackendError::check_scheme(url, Self::SCHEME)?;

    let model = backend::model_id(url)?;
    let endpoint = backend::query_param(url, "endpoint")
      .unwrap_or_else(|| HF_INFERENCE_ENDPOINT.to_string());
    let threshold = match backend::query_param(url, "threshold") {
      Some(value) => value
        .parse::<f32>()
        .map_err(|e| BackendError::invalid("threshold", e.to_string()))?,
      None => HF_DEFAULT_THRESHOLD,
    };
    if !(0.0..=1.0).contains(&threshold) {
      return Err(BackendError::invalid(
        "threshold",
        format!("应在 0 到 1 之间, 实际为 {}", threshold),
      ));
    }

    Ok(HfDetectorBuilder {
      model,
      endpoint,
      threshold,
      token: None,
      timeout: DEFAULT_TIMEOUT,
    })
  }
}

impl HfDetectorBuilder {
  pub fn token(mut self, token: Option<String>) -> Self {
    self.token = token;
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn build(self) -> Result<HfDetector, BackendError> {
    let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), self.model);
    info!("检测模型: {}, 服务地址: {}", self.model, url);
    Ok(HfDetector {
      client: backend::http_client(self.timeout)?,
      url,
      threshold: self.threshold,
      token: self.token,
    })
  }
}

/// 通过 Hugging Face 推理接口调用目标检测模型（如 DETR）
pub struct HfDetector {
  client: Client,
  url: String,
  threshold: f32,
  token: Option<String>,
}

impl HfDetector {
  pub fn url(&self) -> &str {
    &self.url
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
  let mut buffer = Cursor::new(Vec::new());
  image.write_to(&mut buffer, ImageFormat::Png)?;
  Ok(buffer.into_inner())
}

/// 解析检测服务的返回，并按阈值过滤（保持原有顺序）
fn parse_detections(body: &[u8], threshold: f32) -> Result<Vec<Detection>, ModelInvocationError> {
  match serde_json::from_slice::<DetectionResponse>(body)? {
    DetectionResponse::Detections(detections) => Ok(
      detections
        .into_iter()
        .filter(|d| d.score >= threshold)
        .collect(),
    ),
    DetectionResponse::Error {
      error,
      estimated_time,
    } => {
      let message = match estimated_time {
        Some(t) => format!("{} (预计 {:.0} 秒后可用)", error, t),
        None => error,
      };
      Err(ModelInvocationError::Service(message))
    }
  }
}

impl Detect for HfDetector {
  fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, ModelInvocationError> {
    let body = encode_png(image)?;
    debug!(
      "上传图像 {}x{}, 大小: {:.2} KB",
      image.width(),
      image.height(),
      body.len() as f64 / 1024.0
    );

    let mut request = self
      .client
      .post(&self.url)
      .header(reqwest::header::CONTENT_TYPE, "image/png")
      .body(body);
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request.send()?;
    let status = response.status();
    let bytes = response.bytes()?;

    if !status.is_success() {
      let message = match parse_detections(&bytes, self.threshold) {
        Err(ModelInvocationError::Service(message)) => message,
        _ => String::from_utf8_lossy(&bytes).into_owned(),
      };
      error!("检测服务返回错误 {}: {}", status, message);
      return Err(ModelInvocationError::Status {
        status: status.as_u16(),
        message,
      });
    }

    let detections = parse_detections(&bytes, self.threshold)?;
    debug!("检测到 {} 个目标", detections.len());
    Ok(detections)
  }
}
