use nalgebra::{center, distance, Point2};

use crate::config::AnchorConfig;
use crate::pose::{KeypointIndex, LandmarkFrame};

/// 両肩がこの距離（ピクセル）未満なら同一点検出とみなして使わない
const DEGENERATE_SPAN_PX: f32 = 1e-3;

/// 採用されたアンカー戦略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorStrategy {
    /// 両肩 + 両腰
    FullTorso,
    /// 両肩のみ
    ShouldersOnly,
    /// 両腰のみ（位置だけ更新）
    HipsOnly,
}

impl AnchorStrategy {
    /// スケール・回転を更新できる戦略か
    pub fn has_shoulders(self) -> bool {
        !matches!(self, Self::HipsOnly)
    }
}

/// 画像空間でのアンカー（投影前）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub strategy: AnchorStrategy,
    /// 衣服を置く点
    pub center_img: Point2<f32>,
    /// 肩幅（ピクセル）。0 はスケール更新なし
    pub scale_ref_img: f32,
    /// 肩中点→腰中点の距離（ピクセル）
    pub torso_height_img: Option<f32>,
    pub yaw_rad: f32,
    /// 左肩, 右肩
    pub shoulders: Option<[Point2<f32>; 2]>,
    pub shoulder_mid_img: Option<Point2<f32>>,
    pub hip_mid_img: Option<Point2<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnchorResult {
    Resolved(Anchor),
    Unresolved,
}

impl AnchorResult {
    pub fn anchor(&self) -> Option<&Anchor> {
        match self {
            Self::Resolved(anchor) => Some(anchor),
            Self::Unresolved => None,
        }
    }
}

/// ランドマークの有無から戦略を選び、画像空間のアンカーを計算する
///
/// 毎ティック独立に評価し、状態は持たない。ミラー反転は行わない。
pub struct AnchorSelector {
    shoulder_confidence_min: f32,
    hip_confidence_min: f32,
    hip_drop_fraction: f32,
    torso_drop_fraction: f32,
    torso_drop_offset_fraction: f32,
    anchor_offset_px: f32,
}

impl AnchorSelector {
    pub fn from_config(config: &AnchorConfig) -> Self {
        Self {
            shoulder_confidence_min: config.shoulder_confidence_min,
            hip_confidence_min: config.hip_confidence_min,
            hip_drop_fraction: config.hip_drop_fraction,
            torso_drop_fraction: config.torso_drop_fraction,
            torso_drop_offset_fraction: config.torso_drop_offset_fraction,
            anchor_offset_px: config.anchor_offset_px,
        }
    }

    /// fallback_yaw: 腰のみの場合に使う直前のyaw
    pub fn select(&self, frame: &LandmarkFrame, fallback_yaw: f32) -> AnchorResult {
        let hips = self.pair(frame, KeypointIndex::LeftHip, KeypointIndex::RightHip, self.hip_confidence_min);

        if let Some([left, right]) = self.pair(
            frame,
            KeypointIndex::LeftShoulder,
            KeypointIndex::RightShoulder,
            self.shoulder_confidence_min,
        ) {
            let span = distance(&left, &right);
            if span >= DEGENERATE_SPAN_PX {
                return AnchorResult::Resolved(self.shoulder_anchor(left, right, span, hips));
            }
        }

        match hips {
            Some([left_hip, right_hip]) => {
                let hip_mid = center(&left_hip, &right_hip);
                AnchorResult::Resolved(Anchor {
                    strategy: AnchorStrategy::HipsOnly,
                    center_img: Point2::new(hip_mid.x, hip_mid.y + self.anchor_offset_px),
                    scale_ref_img: 0.0,
                    torso_height_img: None,
                    yaw_rad: fallback_yaw,
                    shoulders: None,
                    shoulder_mid_img: None,
                    hip_mid_img: Some(hip_mid),
                })
            }
            None => AnchorResult::Unresolved,
        }
    }

    fn shoulder_anchor(
        &self,
        left: Point2<f32>,
        right: Point2<f32>,
        span: f32,
        hips: Option<[Point2<f32>; 2]>,
    ) -> Anchor {
        let shoulder_mid = center(&left, &right);
        let yaw_rad = f32::atan2(left.y - right.y, left.x - right.x);

        // 腰が見えていれば腰方向へ半分 + 肩幅の一定割合だけ下げる
        // 見えなければ肩幅を胴の長さの代わりに使う
        let (strategy, drop, hip_mid, torso_height_img) = match hips {
            Some([left_hip, right_hip]) => {
                let hip_mid = center(&left_hip, &right_hip);
                let drop = self.torso_drop_fraction * (hip_mid.y - shoulder_mid.y)
                    + self.torso_drop_offset_fraction * span;
                (
                    AnchorStrategy::FullTorso,
                    drop,
                    Some(hip_mid),
                    Some(distance(&shoulder_mid, &hip_mid)),
                )
            }
            None => (AnchorStrategy::ShouldersOnly, self.hip_drop_fraction * span, None, None),
        };

        Anchor {
            strategy,
            center_img: Point2::new(shoulder_mid.x, shoulder_mid.y + drop + self.anchor_offset_px),
            scale_ref_img: span,
            torso_height_img,
            yaw_rad,
            shoulders: Some([left, right]),
            shoulder_mid_img: Some(shoulder_mid),
            hip_mid_img: hip_mid,
        }
    }

    fn pair(
        &self,
        frame: &LandmarkFrame,
        left: KeypointIndex,
        right: KeypointIndex,
        threshold: f32,
    ) -> Option<[Point2<f32>; 2]> {
        let l = frame.confident(left, threshold)?;
        let r = frame.confident(right, threshold)?;
        Some([Point2::new(l.x, l.y), Point2::new(r.x, r.y)])
    }
}

impl Default for AnchorSelector {
    fn default() -> Self {
        Self::from_config(&AnchorConfig::default())
    }
}
