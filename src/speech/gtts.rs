// 该文件是 Kanshuo （看说） 项目的一部分。
// src/speech/gtts.rs - Google 翻译语音合成
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
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  backend::{self, BackendError, DEFAULT_TIMEOUT},
  speech::{AudioArtifact, AudioFormat, SynthesisError, Synthesize, non_empty_text},
};

const GTTS_SCHEME: &str = "gtts";
const GTTS_DEFAULT_LANG: &str = "en";
const GTTS_DEFAULT_TLD: &str = "com";
// 接口单次请求的最大字符数
const GTTS_MAX_CHARS: usize = 100;
const GTTS_NORMAL_SPEED: f32 = 1.0;
const GTTS_SLOW_SPEED: f32 = 0.3;

pub struct GttsSynthesizerBuilder {
  lang: String,
  tld: String,
  slow: bool,
  timeout: Duration,
  audio_dir: PathBuf,
}

impl FromUrlWithScheme for GttsSynthesizerBuilder {
  const SCHEME: &'static str = GTTS_SCHEME;
}

impl FromUrl for GttsSynthesizerBuilder {
  type Error = BackendError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    BackendError::check_scheme(url, Self::SCHEME)?;

    let lang = url
      .host_str()
      .filter(|host| !host.is_empty())
      .unwrap_or(GTTS_DEFAULT_LANG)
      .to_string();
    let tld = backend::query_param(url, "tld").unwrap_or_else(|| GTTS_DEFAULT_TLD.to_string());
    if tld.is_empty() || !tld.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
      return Err(BackendError::invalid("tld", format!("非法的域名后缀: {}", tld)));
    }
    let slow = match backend::query_param(url, "slow") {
      Some(value) => backend::parse_bool("slow", &value)?,
      None => false,
    };

    Ok(GttsSynthesizerBuilder {
      lang,
      tld,
      slow,
      timeout: DEFAULT_TIMEOUT,
      audio_dir: std::env::temp_dir(),
    })
  }
}

impl GttsSynthesizerBuilder {
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn audio_dir(mut self, audio_dir: PathBuf) -> Self {
    self.audio_dir = audio_dir;
    self
  }

  pub fn build(self) -> Result<GttsSynthesizer, BackendError> {
    info!(
      "语音合成: Google 翻译, 语言: {}, 域名: translate.google.{}",
      self.lang, self.tld
    );
    Ok(GttsSynthesizer {
      client: backend::http_client(self.timeout)?,
      lang: self.lang,
      tld: self.tld,
      slow: self.slow,
      audio_dir: self.audio_dir,
    })
  }
}

/// 调用 Google 翻译朗读接口，输出 MP3
pub struct GttsSynthesizer {
  client: Client,
  lang: String,
  tld: String,
  slow: bool,
  audio_dir: PathBuf,
}

impl GttsSynthesizer {
  fn request_url(&self, chunk: &str, index: usize, total: usize) -> String {
    let speed = if self.slow {
      GTTS_SLOW_SPEED
    } else {
      GTTS_NORMAL_SPEED
    };
    format!(
      "https://translate.google.{}/translate_tts?ie=UTF-8&client=tw-ob&tl={}&ttsspeed={}&total={}&idx={}&textlen={}&q={}",
      self.tld,
      urlencoding::encode(&self.lang),
      speed,
      total,
      index,
      chunk.chars().count(),
      urlencoding::encode(chunk)
    )
  }

  fn fetch_chunk(&self, url: &str) -> Result<Vec<u8>, SynthesisError> {
    let response = self.client.get(url).send()?;
    let status = response.status();
    let bytes = response.bytes()?;
    if !status.is_success() {
      let message = String::from_utf8_lossy(&bytes).chars().take(200).collect::<String>();
      error!("朗读接口返回错误 {}: {}", status, message);
      return Err(SynthesisError::Status {
        status: status.as_u16(),
        message,
      });
    }
    if bytes.is_empty() {
      return Err(SynthesisError::EmptyAudio);
    }
    Ok(bytes.to_vec())
  }
}

/// 按空白切分文本，每段不超过 `max` 个字符；超长单词直接截断
pub(crate) fn split_text(text: &str, max: usize) -> Vec<String> {
  let mut chunks = Vec::new();
  let mut current = String::new();
  let mut current_len = 0;

  for word in text.split_whitespace() {
    let word_len = word.chars().count();
    if word_len > max {
      if !current.is_empty() {
        chunks.push(std::mem::take(&mut current));
      }
      let chars: Vec<char> = word.chars().collect();
      let mut pieces = chars.chunks(max).map(|c| c.iter().collect::<String>());
      let mut last = pieces.next().unwrap_or_default();
      for piece in pieces {
        chunks.push(std::mem::replace(&mut last, piece));
      }
      current_len = last.chars().count();
      current = last;
    } else if current.is_empty() {
      current.push_str(word);
      current_len = word_len;
    } else if current_len + 1 + word_len <= max {
      current.push(' ');
      current.push_str(word);
      current_len += 1 + word_len;
    } else {
      chunks.push(std::mem::take(&mut current));
      current.push_str(word);
      current_len = word_len;
    }
  }
  if !current.is_empty() {
    chunks.push(current);
  }
  chunks
}

impl Synthesize for GttsSynthesizer {
  fn synthesize(&self, text: &str) -> Result<AudioArtifact, SynthesisError> {
    let text = non_empty_text(text)?;
    let chunks = split_text(text, GTTS_MAX_CHARS);
    debug!("文本分为 {} 段", chunks.len());

    // MP3 帧可直接拼接
    let mut audio = Vec::new();
    for (index, chunk) in chunks.iter().enumerate() {
      let url = self.request_url(chunk, index, chunks.len());
      audio.extend(self.fetch_chunk(&url)?);
    }

    AudioArtifact::write(&self.audio_dir, AudioFormat::Mp3, &audio)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_text_is_one_chunk() {
    assert_eq!(
      split_text("This picture contains 1 cat.", GTTS_MAX_CHARS),
      vec!["This picture contains 1 cat."]
    );
  }

  #[test]
  fn chunks_respect_limit_and_keep_words() {
    let text = "This picture contains 2 persons, 3 cars, 1 bus, 4 traffic lights, 1 fire hydrant, \
                2 stop signs, 1 parking meter, 5 benches, 2 birds, 1 cat and 1 dog.";
    let chunks = split_text(text, 40);
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.chars().count() <= 40));
    let rejoined = chunks.join(" ");
    let normalized: Vec<&str> = text.split_whitespace().collect();
    assert_eq!(rejoined, normalized.join(" "));
  }

  #[test]
  fn long_words_are_split_hard() {
    let word = "a".repeat(250);
    let chunks = split_text(&format!("x {} y", word), GTTS_MAX_CHARS);
    let lens: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
    assert_eq!(lens, vec![1, 100, 100, 52]);
    assert!(chunks[3].ends_with(" y"));
  }

  #[test]
  fn blank_text_has_no_chunks() {
    assert!(split_text(" \t\n", GTTS_MAX_CHARS).is_empty());
  }

  #[test]
  fn builder_from_url() {
    let url = Url::parse("gtts://fr?tld=ca&slow=true").unwrap();
    let synthesizer = GttsSynthesizerBuilder::from_url(&url).unwrap().build().unwrap();
    assert_eq!(synthesizer.lang, "fr");
    assert_eq!(synthesizer.tld, "ca");
    assert!(synthesizer.slow);

    let request = synthesizer.request_url("1 cat & 2 dogs", 0, 1);
    assert!(request.starts_with("https://translate.google.ca/translate_tts?"));
    assert!(request.contains("tl=fr"));
    assert!(request.contains("ttsspeed=0.3"));
    assert!(request.contains("q=1%20cat%20%26%202%20dogs"));
  }

  #[test]
  fn builder_defaults_to_english() {
    let url = Url::parse("gtts://").unwrap();
    let builder = GttsSynthesizerBuilder::from_url(&url).unwrap();
    assert_eq!(builder.lang, "en");
    assert_eq!(builder.tld, "com");
    assert!(!builder.slow);
  }

  #[test]
  fn builder_rejects_bad_parameters() {
    for bad in ["gtts://en?tld=com/evil", "gtts://en?slow=perhaps", "hf://en"] {
      let url = Url::parse(bad).unwrap();
      assert!(GttsSynthesizerBuilder::from_url(&url).is_err(), "{}", bad);
    }
  }

  #[test]
  fn empty_text_fails_before_any_request() {
    let url = Url::parse("gtts://en").unwrap();
    let synthesizer = GttsSynthesizerBuilder::from_url(&url).unwrap().build().unwrap();
    assert!(matches!(
      synthesizer.synthesize("   "),
      Err(SynthesisError::EmptyText)
    ));
  }
}
