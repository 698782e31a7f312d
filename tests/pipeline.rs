// 该文件是 Kanshuo （看说） 项目的一部分。
// tests/pipeline.rs - 流程集成测试
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
  cell::{Cell, RefCell},
  path::PathBuf,
};

use image::{Rgb, RgbImage};
use kanshuo::{
  AudioArtifact, AudioFormat, BoundingBox, Detect, Detection, ModelInvocationError, Pipeline,
  PipelineError, SynthesisError, Synthesize,
  input::read_image,
  overlay::{LabelFont, Overlay, Record},
};

struct FixedDetector {
  detections: Vec<Detection>,
  calls: Cell<usize>,
}

impl Detect for FixedDetector {
  fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>, ModelInvocationError> {
    self.calls.set(self.calls.get() + 1);
    Ok(self.detections.clone())
  }
}

struct BrokenDetector;

impl Detect for BrokenDetector {
  fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>, ModelInvocationError> {
    Err(ModelInvocationError::Status {
      status: 400,
      message: "malformed image".to_string(),
    })
  }
}

/// 把文本原样写成“音频”，并记下收到的文本
struct EchoSynthesizer {
  dir: PathBuf,
  spoken: RefCell<Vec<String>>,
}

impl Synthesize for EchoSynthesizer {
  fn synthesize(&self, text: &str) -> Result<AudioArtifact, SynthesisError> {
    self.spoken.borrow_mut().push(text.to_string());
    AudioArtifact::write(&self.dir, AudioFormat::Mp3, text.as_bytes())
  }
}

fn detection(label: &str, score: f32, bbox: [f32; 4]) -> Detection {
  Detection {
    label: label.to_string(),
    score,
    bbox: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
  }
}

fn overlay() -> Overlay {
  Overlay::new(LabelFont::bitmap(12.0))
}

#[test]
fn process_returns_all_three_artifacts() {
  let dir = tempfile::tempdir().unwrap();
  let detector = FixedDetector {
    detections: vec![
      detection("person", 0.99, [4.0, 4.0, 60.0, 90.0]),
      detection("dog", 0.87, [70.0, 50.0, 120.0, 95.0]),
      detection("person", 0.91, [80.0, 2.0, 110.0, 40.0]),
      detection("frisbee", 0.62, [30.5, 10.25, 44.75, 20.0]),
    ],
    calls: Cell::new(0),
  };
  let synthesizer = EchoSynthesizer {
    dir: dir.path().to_path_buf(),
    spoken: RefCell::new(Vec::new()),
  };
  let pipeline = Pipeline::new(detector, overlay(), synthesizer);

  let image = RgbImage::from_pixel(128, 96, Rgb([40, 80, 120]));
  let before = image.clone();
  let narration = pipeline.process(&image).unwrap();

  assert_eq!(image, before);
  assert_eq!(
    narration.description,
    "This picture contains 2 persons, 1 dog and 1 frisbee."
  );
  assert_eq!(narration.annotated.regions.len(), 4);
  assert_eq!(narration.annotated.regions[3].text, "frisbee 0.62");

  let (annotated, description, audio) = narration.into_parts();
  assert_eq!(annotated.image.dimensions(), (128, 96));
  assert_eq!(audio.format(), AudioFormat::Mp3);
  assert_eq!(std::fs::read_to_string(audio.path()).unwrap(), description);
  assert_eq!(pipeline.detector().calls.get(), 1);
  assert_eq!(*pipeline.synthesizer().spoken.borrow(), vec![description]);
}

#[test]
fn repeated_runs_do_not_collide() {
  let dir = tempfile::tempdir().unwrap();
  let pipeline = Pipeline::new(
    FixedDetector {
      detections: vec![detection("cat", 0.9, [1.0, 1.0, 10.0, 10.0])],
      calls: Cell::new(0),
    },
    overlay(),
    EchoSynthesizer {
      dir: dir.path().to_path_buf(),
      spoken: RefCell::new(Vec::new()),
    },
  );

  let image = RgbImage::new(20, 20);
  let first = pipeline.process(&image).unwrap();
  let second = pipeline.process(&image).unwrap();
  assert_ne!(first.audio.path(), second.audio.path());
  assert_eq!(first.description, "This picture contains 1 cat.");
  assert_eq!(first.description, second.description);
  assert_eq!(pipeline.detector().calls.get(), 2);
}

#[test]
fn empty_scene_is_still_narrated() {
  let dir = tempfile::tempdir().unwrap();
  let synthesizer = EchoSynthesizer {
    dir: dir.path().to_path_buf(),
    spoken: RefCell::new(Vec::new()),
  };
  let detector = FixedDetector {
    detections: Vec::new(),
    calls: Cell::new(0),
  };
  let pipeline = Pipeline::new(detector, overlay(), synthesizer);

  let image = RgbImage::from_pixel(8, 8, Rgb([9, 9, 9]));
  let narration = pipeline.process(&image).unwrap();
  assert_eq!(
    narration.description,
    "This picture contains no recognizable objects."
  );
  assert_eq!(narration.annotated.image, image);
  assert!(narration.annotated.regions.is_empty());
}

#[test]
fn detection_error_is_returned_unchanged() {
  let dir = tempfile::tempdir().unwrap();
  let synthesizer = EchoSynthesizer {
    dir: dir.path().to_path_buf(),
    spoken: RefCell::new(Vec::new()),
  };
  let pipeline = Pipeline::new(BrokenDetector, overlay(), synthesizer);

  match pipeline.process(&RgbImage::new(4, 4)) {
    Err(PipelineError::Detection(ModelInvocationError::Status { status, message })) => {
      assert_eq!(status, 400);
      assert_eq!(message, "malformed image");
    }
    other => panic!("unexpected: {:?}", other.map(|n| n.description)),
  }
  assert!(pipeline.synthesizer().spoken.borrow().is_empty());
  assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn saved_outputs_round_trip() {
  let dir = tempfile::tempdir().unwrap();
  let pipeline = Pipeline::new(
    FixedDetector {
      detections: vec![detection("cup", 0.5, [2.0, 2.0, 30.0, 30.0])],
      calls: Cell::new(0),
    },
    overlay(),
    EchoSynthesizer {
      dir: dir.path().join("audio"),
      spoken: RefCell::new(Vec::new()),
    },
  );

  let input = dir.path().join("photo.png");
  RgbImage::from_pixel(32, 32, Rgb([200, 200, 200]))
    .save(&input)
    .unwrap();
  let image = read_image(&input).unwrap();
  let narration = pipeline.process(&image).unwrap();

  let output = dir.path().join("out").join("annotated.png");
  narration.annotated.save(&output).unwrap();
  Record::record(&narration.detections, &output).unwrap();

  let reloaded = read_image(&output).unwrap();
  assert_eq!(reloaded, narration.annotated.image);
  assert_eq!(
    std::fs::read_to_string(dir.path().join("out").join("annotated.txt")).unwrap(),
    "cup, 0.5000, 2.0, 2.0, 30.0, 30.0"
  );

  let (_, _, audio) = narration.into_parts();
  let target = dir.path().join("narration.mp3");
  audio.persist(&target).unwrap();
  assert_eq!(
    std::fs::read_to_string(&target).unwrap(),
    "This picture contains 1 cup."
  );
}
