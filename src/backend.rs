// 该文件是 Kanshuo （看说） 项目的一部分。
// src/backend.rs - 远程后端的公共配置
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

use thiserror::Error;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
#[cfg(feature = "reqwest")]
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum BackendError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: String, found: String },
  #[error("不支持的后端: {0}")]
  Unsupported(String),
  #[error("缺少模型名称: {0}")]
  MissingModel(String),
  #[error("参数 '{name}' 无效: {reason}")]
  InvalidParameter { name: String, reason: String },
  #[cfg(feature = "reqwest")]
  #[error("HTTP 客户端错误: {0}")]
  HttpClient(#[from] reqwest::Error),
}

impl BackendError {
  pub fn check_scheme(url: &Url, expected: &str) -> Result<(), BackendError> {
    if url.scheme() != expected {
      return Err(BackendError::SchemeMismatch {
        expected: expected.to_string(),
        found: url.scheme().to_string(),
      });
    }
    Ok(())
  }

  pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
    BackendError::InvalidParameter {
      name: name.to_string(),
      reason: reason.into(),
    }
  }
}

/// 所有远程后端共享的选项
#[derive(Debug, Clone)]
pub struct RemoteOptions {
  /// 访问令牌（Hugging Face 等）
  pub token: Option<String>,
  /// 单次请求超时时间
  pub timeout: Duration,
  /// 合成音频的存放目录
  pub audio_dir: PathBuf,
}

impl Default for RemoteOptions {
  fn default() -> Self {
    Self {
      token: None,
      timeout: DEFAULT_TIMEOUT,
      audio_dir: std::env::temp_dir(),
    }
  }
}

/// 由 `scheme://owner/name` 形式的 URL 取出模型名称，例如 `facebook/detr-resnet-50`
pub fn model_id(url: &Url) -> Result<String, BackendError> {
  let host = url.host_str().unwrap_or("");
  let id = format!("{}{}", host, url.path());
  let id = id.trim_matches('/');
  if id.is_empty() {
    return Err(BackendError::MissingModel(url.to_string()));
  }
  Ok(id.to_string())
}

/// 读取 URL 查询参数
pub fn query_param(url: &Url, name: &str) -> Option<String> {
  url
    .query_pairs()
    .find(|(key, _)| key == name)
    .map(|(_, value)| value.into_owned())
}

pub fn parse_bool(name: &str, value: &str) -> Result<bool, BackendError> {
  match value {
    "1" | "true" | "yes" => Ok(true),
    "0" | "false" | "no" => Ok(false),
    other => Err(BackendError::invalid(name, format!("无法解析为布尔值: {}", other))),
  }
}

#[cfg(feature = "reqwest")]
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client, BackendError> {
  let client = reqwest::blocking::Client::builder()
    .timeout(timeout)
    .user_agent(USER_AGENT)
    .build()?;
  Ok(client)
}
