use nalgebra::{Point2, Vector2};

use super::skeleton::{ANCHOR_ARM_PX, SKELETON_CONNECTIONS};
use crate::config::DisplayConfig;
use crate::pose::{KeypointIndex, LandmarkFrame};
use crate::projection::to_view;

/// 元画像のピクセル座標 → オーバーレイ面のピクセル座標
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMapping {
    pub image_width: u32,
    pub image_height: u32,
    pub display_width: u32,
    pub display_height: u32,
    pub mirror_x: bool,
}

impl DisplayMapping {
    /// display_* が 0 なら元画像と同じサイズ
    pub fn new(image_width: u32, image_height: u32, display_width: u32, display_height: u32, mirror_x: bool) -> Self {
        Self {
            image_width,
            image_height,
            display_width: if display_width == 0 { image_width } else { display_width },
            display_height: if display_height == 0 { image_height } else { display_height },
            mirror_x,
        }
    }

    pub fn from_config(config: &DisplayConfig, image_width: u32, image_height: u32) -> Self {
        Self::new(image_width, image_height, config.width, config.height, config.mirror_x)
    }

    /// 表示空間（反転済み）の画像座標を表示ピクセルへ
    pub fn view_to_display(&self, point: Point2<f32>) -> Point2<f32> {
        let sx = self.display_width as f32 / self.image_width.max(1) as f32;
        let sy = self.display_height as f32 / self.image_height.max(1) as f32;
        Point2::new(point.x * sx, point.y * sy)
    }

    /// 元画像座標を表示ピクセルへ（必要なら反転）
    pub fn image_to_display(&self, point: Point2<f32>) -> Point2<f32> {
        self.view_to_display(to_view(point, self.image_width, self.mirror_x))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point2<f32>,
    pub end: Point2<f32>,
}

/// デバッグオーバーレイ1枚分の図形（表示ピクセル）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFrame {
    pub points: Vec<Point2<f32>>,
    pub segments: Vec<Segment>,
    pub anchor: Option<Point2<f32>>,
}

impl OverlayFrame {
    /// 閾値以上の信頼度のキーポイントと、その間の骨格線
    pub fn skeleton(frame: &LandmarkFrame, mapping: &DisplayMapping, min_score: f32) -> Self {
        let visible = |idx: KeypointIndex| {
            frame
                .get(idx)
                .filter(|kp| kp.score >= min_score)
                .map(|kp| mapping.image_to_display(Point2::new(kp.x, kp.y)))
        };

        let points = KeypointIndex::ALL.iter().filter_map(|&idx| visible(idx)).collect();
        let segments = SKELETON_CONNECTIONS
            .iter()
            .filter_map(|&(a, b)| Some(Segment { start: visible(a)?, end: visible(b)? }))
            .collect();

        Self {
            points,
            segments,
            anchor: None,
        }
    }

    /// 表示空間の画像座標でアンカーを追加
    pub fn with_anchor(mut self, anchor_view: Point2<f32>, mapping: &DisplayMapping) -> Self {
        self.anchor = Some(mapping.view_to_display(anchor_view));
        self
    }

    /// アンカー位置の十字（横線, 縦線）
    pub fn anchor_cross(&self) -> Option<[Segment; 2]> {
        let p = self.anchor?;
        let dx = Vector2::new(ANCHOR_ARM_PX, 0.0);
        let dy = Vector2::new(0.0, ANCHOR_ARM_PX);
        Some([
            Segment { start: p - dx, end: p + dx },
            Segment { start: p - dy, end: p + dy },
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.segments.is_empty() && self.anchor.is_none()
    }
}
