// 该文件是 Kanshuo （看说） 项目的一部分。
// src/describe.rs - 检测结果的自然语言描述
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

use crate::detection::Detection;

const DESCRIPTION_PREFIX: &str = "This picture contains";
const EMPTY_DESCRIPTION: &str = "This picture contains no recognizable objects.";

/// 按标签计数，保持标签首次出现的顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectCount {
  entries: Vec<(String, usize)>,
}

impl ObjectCount {
  pub fn from_detections(detections: &[Detection]) -> Self {
    let mut count = Self::default();
    for detection in detections {
      count.add(&detection.label);
    }
    count
  }

  pub fn add(&mut self, label: &str) {
    match self.entries.iter_mut().find(|(name, _)| name == label) {
      Some((_, n)) => *n += 1,
      None => self.entries.push((label.to_string(), 1)),
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, label: &str) -> Option<usize> {
    self
      .entries
      .iter()
      .find(|(name, _)| name == label)
      .map(|(_, n)| *n)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
    self.entries.iter().map(|(name, n)| (name.as_str(), *n))
  }
}

/// 生成一句描述图中物体数量的英文句子
///
/// 例如 `This picture contains 1 cat, 2 dogs and 1 person.`；
/// 没有检测结果时返回固定的 "no recognizable objects" 句子。
pub fn describe(detections: &[Detection]) -> String {
  let count = ObjectCount::from_detections(detections);
  if count.is_empty() {
    return EMPTY_DESCRIPTION.to_string();
  }

  let total = count.len();
  let mut text = String::from(DESCRIPTION_PREFIX);
  for (i, (label, n)) in count.iter().enumerate() {
    text.push_str(&format!(" {} {}", n, label));
    if n > 1 {
      text.push('s');
    }
    if i + 2 < total {
      text.push(',');
    } else if i + 2 == total {
      text.push_str(" and");
    }
  }
  text.push('.');
  text
}
