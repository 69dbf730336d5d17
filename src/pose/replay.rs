use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use super::keypoint::{Landmark, LandmarkFrame};

/// 記録ファイル1行分の検出結果
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedFrame {
    pub image_width: u32,
    pub image_height: u32,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl RecordedFrame {
    pub fn to_frame(&self) -> LandmarkFrame {
        LandmarkFrame::from_landmarks(&self.landmarks, self.image_width, self.image_height)
    }
}

/// JSON Lines 形式のランドマーク記録を1ティックずつ返す
///
/// 各行は `null`（このティックは検出なし）か RecordedFrame。
/// 壊れた行は警告を出して検出なしとして扱う。空行は読み飛ばす。
pub struct ReplaySource<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl ReplaySource<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open recording {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for ReplaySource<R> {
    type Item = Option<LandmarkFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("recording read error after line {}: {}", self.line_no, e);
                    return None;
                }
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(match serde_json::from_str::<Option<RecordedFrame>>(trimmed) {
                Ok(recorded) => recorded.map(|r| r.to_frame()),
                Err(e) => {
                    log::warn!("skipping malformed recording line {}: {}", self.line_no, e);
                    None
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::KeypointIndex;
    use std::io::Cursor;

    #[test]
    fn test_replay_lines() {
        let data = r#"{"image_width":640,"image_height":480,"landmarks":[{"name":"left_hip","x":410,"y":380,"score":0.25},{"name":"elbow_pad","x":1,"y":1,"score":1}]}
null

{"image_width": 640, "image_height": 480}
not json
"#;
        let frames: Vec<_> = ReplaySource::new(Cursor::new(data)).collect();
        assert_eq!(frames.len(), 4);

        let first = frames[0].as_ref().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first.get(KeypointIndex::LeftHip).map(|kp| kp.score), Some(0.25));

        assert!(frames[1].is_none());
        assert!(frames[2].as_ref().unwrap().is_empty());
        assert!(frames[3].is_none());
    }
}
