use anyhow::Result;
use nalgebra::{Point2, Vector3};

use super::adjust::{apply_override, ManualAdjustment, PlacementTarget};
use super::anchor::{Anchor, AnchorResult, AnchorSelector, AnchorStrategy};
use super::fit::{fit_scale, ObjectBounds, ScaleLimits};
use super::smooth::TransformSmoother;
use crate::config::Config;
use crate::pose::LandmarkFrame;
use crate::projection::{project_to_plane, to_view, CameraModel, ProjectionError};
use crate::transform::WorldTransform;

/// 投影後の肩幅がこれ以下ならスケールを更新しない
const MIN_SHOULDER_WIDTH_WORLD: f32 = 1e-4;

/// 変換を更新しなかった理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// ランドマークソースがまだ結果を出していない
    NoFrame,
    /// 使えるランドマークがない
    Unresolved,
    /// 画像サイズが 0
    InvalidImage,
    /// カメラパラメータが不正
    InvalidCamera,
    /// 光線が基準平面と平行
    DegenerateRay,
    /// NaN/Infinity を含む結果
    Corrupt,
}

/// 1ティックの結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Updated {
        transform: WorldTransform,
        strategy: AnchorStrategy,
        /// 投影に使った表示空間の画像座標（デバッグ描画用）
        anchor_view: Point2<f32>,
    },
    Held {
        transform: WorldTransform,
        reason: HoldReason,
    },
}

impl TickOutcome {
    pub fn transform(&self) -> &WorldTransform {
        match self {
            Self::Updated { transform, .. } | Self::Held { transform, .. } => transform,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }
}

/// ポーズから衣服の配置を決める1ティック分のパイプライン
///
/// LandmarkFrame → Anchor Selector → Projection → Manual Override → Smoother
///
/// 保持する状態は適用中の WorldTransform と直前の yaw だけ。
pub struct AnchorEngine {
    selector: AnchorSelector,
    smoother: TransformSmoother,
    camera: CameraModel,
    bounds: ObjectBounds,
    limits: ScaleLimits,
    mirror_x: bool,
    last_yaw: f32,
    last_strategy: Option<AnchorStrategy>,
}

impl AnchorEngine {
    /// 設定を検証してから作成する（不正なスケール範囲などは Err）
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let limits = config.anchor.scale_limits();
        let mut smoother = TransformSmoother::from_config(&config.smooth);
        smoother.reset(WorldTransform::identity().clamp_scale(limits.min, limits.max));
        Ok(Self {
            selector: AnchorSelector::from_config(&config.anchor),
            smoother,
            camera: config.camera.to_model(),
            bounds: config.garment.bounds(),
            limits,
            mirror_x: config.display.mirror_x,
            last_yaw: 0.0,
            last_strategy: None,
        })
    }

    /// 現在適用中の変換
    pub fn transform(&self) -> &WorldTransform {
        self.smoother.current()
    }

    /// アセット差し替え時など、初期状態に戻す
    pub fn reset(&mut self) {
        self.smoother
            .reset(WorldTransform::identity().clamp_scale(self.limits.min, self.limits.max));
        self.last_yaw = 0.0;
        self.last_strategy = None;
    }

    /// アセットのバウンディングボックスを更新
    pub fn set_bounds(&mut self, bounds: ObjectBounds) {
        self.bounds = bounds;
    }

    /// 1ティック分の処理
    ///
    /// frame が None（推論が未完了）や未解決のときは変換をそのまま保持する。
    /// adjustment はこのティックの開始時点で取得したスナップショット。
    pub fn tick(&mut self, frame: Option<&LandmarkFrame>, adjustment: ManualAdjustment) -> TickOutcome {
        let Some(frame) = frame else {
            return self.hold(HoldReason::NoFrame);
        };
        if !frame.has_valid_size() {
            return self.hold(HoldReason::InvalidImage);
        }

        let anchor = match self.selector.select(frame, self.last_yaw) {
            AnchorResult::Resolved(anchor) => anchor,
            AnchorResult::Unresolved => {
                self.note_strategy(None);
                return self.hold(HoldReason::Unresolved);
            }
        };
        self.note_strategy(Some(anchor.strategy));

        let (target, anchor_view) = match self.compute_target(frame, &anchor, &adjustment) {
            Ok(result) => result,
            Err(ProjectionError::DegenerateRay(dz)) => {
                log::warn!("degenerate projection ray (direction.z = {}), holding transform", dz);
                return self.hold(HoldReason::DegenerateRay);
            }
            Err(ProjectionError::InvalidCamera) => {
                log::warn!("invalid camera {:?}, holding transform", self.camera);
                return self.hold(HoldReason::InvalidCamera);
            }
            Err(e @ ProjectionError::InvalidImageSize { .. }) => {
                log::warn!("{}, holding transform", e);
                return self.hold(HoldReason::InvalidImage);
            }
        };

        if !target.is_finite() {
            log::warn!("discarding non-finite target {:?}", target);
            return self.hold(HoldReason::Corrupt);
        }

        let smoothed = self.smoother.apply(&target);
        if anchor.strategy.has_shoulders() {
            self.last_yaw = anchor.yaw_rad;
        }

        TickOutcome::Updated {
            transform: smoothed,
            strategy: anchor.strategy,
            anchor_view,
        }
    }

    fn compute_target(
        &self,
        frame: &LandmarkFrame,
        anchor: &Anchor,
        adjustment: &ManualAdjustment,
    ) -> Result<(WorldTransform, Point2<f32>), ProjectionError> {
        let (w, h) = (frame.image_width, frame.image_height);

        let scale_world = match anchor.shoulders {
            Some([left, right]) if anchor.scale_ref_img > 0.0 => {
                let shoulder_width = (self.project(left, w, h)? - self.project(right, w, h)?).norm();
                if shoulder_width > MIN_SHOULDER_WIDTH_WORLD {
                    let torso_height = match (anchor.shoulder_mid_img, anchor.hip_mid_img) {
                        (Some(shoulder_mid), Some(hip_mid)) => Some(
                            (self.project(shoulder_mid, w, h)? - self.project(hip_mid, w, h)?).norm(),
                        ),
                        _ => None,
                    };
                    Some(fit_scale(
                        shoulder_width,
                        torso_height,
                        &self.bounds,
                        adjustment.uniform_scale,
                        &self.limits,
                    ))
                } else {
                    None
                }
            }
            _ => None,
        };

        let placement = PlacementTarget {
            position_img: to_view(anchor.center_img, w, self.mirror_x),
            scale_world,
            yaw_rad: anchor.strategy.has_shoulders().then_some(anchor.yaw_rad),
        };
        let adjusted = apply_override(&placement, adjustment, w, h, &self.limits);

        let position = project_to_plane(adjusted.position_img.x, adjusted.position_img.y, w, h, &self.camera)?;
        let previous = self.smoother.current();
        let target = WorldTransform::new(
            position,
            adjusted.scale_world.unwrap_or(previous.scale),
            adjusted.rotation_z.unwrap_or(previous.rotation_z),
        );
        Ok((target, adjusted.position_img))
    }

    fn project(&self, point: Point2<f32>, w: u32, h: u32) -> Result<Vector3<f32>, ProjectionError> {
        let view = to_view(point, w, self.mirror_x);
        project_to_plane(view.x, view.y, w, h, &self.camera)
    }

    fn hold(&self, reason: HoldReason) -> TickOutcome {
        TickOutcome::Held {
            transform: self.smoother.hold(),
            reason,
        }
    }

    fn note_strategy(&mut self, strategy: Option<AnchorStrategy>) {
        if self.last_strategy != strategy {
            log::debug!("anchor strategy: {:?} -> {:?}", self.last_strategy, strategy);
            self.last_strategy = strategy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KeypointIndex};

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    fn torso_frame() -> LandmarkFrame {
        LandmarkFrame::new(640, 480)
            .with(KeypointIndex::LeftShoulder, Keypoint::new(420.0, 200.0, 0.9))
            .with(KeypointIndex::RightShoulder, Keypoint::new(300.0, 200.0, 0.9))
            .with(KeypointIndex::LeftHip, Keypoint::new(410.0, 380.0, 0.9))
            .with(KeypointIndex::RightHip, Keypoint::new(310.0, 380.0, 0.9))
    }

    fn hips_frame(score: f32) -> LandmarkFrame {
        LandmarkFrame::new(640, 480)
            .with(KeypointIndex::LeftHip, Keypoint::new(410.0, 380.0, score))
            .with(KeypointIndex::RightHip, Keypoint::new(310.0, 380.0, score))
    }

    fn instant_config() -> Config {
        let mut config = Config::default();
        config.smooth.position = 1.0;
        config.smooth.scale = 1.0;
        config.smooth.rotation = 1.0;
        config
    }

    #[test]
    fn test_full_torso_scenario() {
        let mut engine = AnchorEngine::new(&Config::default()).unwrap();
        let outcome = engine.tick(Some(&torso_frame()), ManualAdjustment::default());

        let TickOutcome::Updated { transform, strategy, anchor_view } = outcome else {
            panic!("expected update, got {:?}", outcome);
        };
        assert_eq!(strategy, AnchorStrategy::FullTorso);
        assert!(approx_eq_f32(anchor_view.y, 302.0, 1e-4));
        assert!(transform.is_finite());
        assert!(transform.scale.iter().all(|s| (0.2..=5.0).contains(s)));
        // yaw ≈ 0 なので回転は 0 のまま
        assert!(approx_eq_f32(transform.rotation_z, 0.0, 1e-6));
        // 位置は画像中心より下 (y < 0)
        assert!(transform.position.y < 0.0);
    }

    #[test]
    fn test_target_scale_from_projected_torso() {
        let mut engine = AnchorEngine::new(&instant_config()).unwrap();
        let outcome = engine.tick(Some(&torso_frame()), ManualAdjustment::default());
        let t = outcome.transform();

        // z=0 平面上の 1 ピクセルの大きさ
        let half = 2.0 * (22.5f32).to_radians().tan();
        let px_x = 2.0 * half / 640.0;
        let px_y = 2.0 * half / 480.0;
        let expected_x = 120.0 * px_x / 1.0;
        let expected_y = 180.0 * px_y / 1.2;
        assert!(approx_eq_f32(t.scale.x, expected_x, 1e-4), "x={} expected {}", t.scale.x, expected_x);
        assert!(approx_eq_f32(t.scale.y, expected_y, 1e-4), "y={} expected {}", t.scale.y, expected_y);
        assert!(approx_eq_f32(t.scale.z, (expected_x + expected_y) / 2.0, 1e-4));
    }

    #[test]
    fn test_freeze_on_loss() {
        let mut engine = AnchorEngine::new(&Config::default()).unwrap();
        let t1 = *engine.tick(Some(&torso_frame()), ManualAdjustment::default()).transform();

        let outcome = engine.tick(Some(&LandmarkFrame::new(640, 480)), ManualAdjustment::default());
        assert_eq!(
            outcome,
            TickOutcome::Held {
                transform: t1,
                reason: HoldReason::Unresolved
            }
        );
        assert_eq!(*engine.transform(), t1);
    }

    #[test]
    fn test_no_frame_holds() {
        let mut engine = AnchorEngine::new(&Config::default()).unwrap();
        let outcome = engine.tick(None, ManualAdjustment::default());
        assert_eq!(
            outcome,
            TickOutcome::Held {
                transform: WorldTransform::identity(),
                reason: HoldReason::NoFrame
            }
        );
    }

    #[test]
    fn test_zero_landmarks_unchanged() {
        let mut engine = AnchorEngine::new(&Config::default()).unwrap();
        let before = *engine.transform();
        let outcome = engine.tick(Some(&LandmarkFrame::new(640, 480)), ManualAdjustment::default());
        assert!(!outcome.is_updated());
        assert_eq!(*engine.transform(), before);
    }

    #[test]
    fn test_hips_only_keeps_scale_and_rotation() {
        let mut engine = AnchorEngine::new(&instant_config()).unwrap();
        let adj = ManualAdjustment {
            rotation_z_rad: 0.3,
            ..ManualAdjustment::default()
        };
        let t1 = *engine.tick(Some(&torso_frame()), adj).transform();

        let outcome = engine.tick(Some(&hips_frame(0.25)), adj);
        let TickOutcome::Updated { transform, strategy, .. } = outcome else {
            panic!("expected update, got {:?}", outcome);
        };
        assert_eq!(strategy, AnchorStrategy::HipsOnly);
        assert_eq!(transform.scale, t1.scale);
        assert_eq!(transform.rotation_z, t1.rotation_z);
        assert!(transform.position.y < t1.position.y);
    }

    #[test]
    fn test_hips_only_from_start_keeps_identity_scale() {
        let mut engine = AnchorEngine::new(&Config::default()).unwrap();
        let outcome = engine.tick(Some(&hips_frame(0.25)), ManualAdjustment::default());
        assert!(outcome.is_updated());
        assert_eq!(outcome.transform().scale, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(outcome.transform().rotation_z, 0.0);
    }

    #[test]
    fn test_invalid_image_size_holds() {
        let mut engine = AnchorEngine::new(&Config::default()).unwrap();
        let frame = LandmarkFrame::new(0, 0)
            .with(KeypointIndex::LeftHip, Keypoint::new(410.0, 380.0, 0.9))
            .with(KeypointIndex::RightHip, Keypoint::new(310.0, 380.0, 0.9));
        let outcome = engine.tick(Some(&frame), ManualAdjustment::default());
        assert!(matches!(outcome, TickOutcome::Held { reason: HoldReason::InvalidImage, .. }));
    }

    #[test]
    fn test_degenerate_ray_holds() {
        let mut engine = AnchorEngine::new(&Config::default()).unwrap();
        let frame = LandmarkFrame::new(640, 480)
            .with(KeypointIndex::LeftHip, Keypoint::new(1.0e10, 380.0, 0.9))
            .with(KeypointIndex::RightHip, Keypoint::new(1.0e10, 380.0, 0.9));
        let outcome = engine.tick(Some(&frame), ManualAdjustment::default());
        assert!(matches!(outcome, TickOutcome::Held { reason: HoldReason::DegenerateRay, .. }));
        assert_eq!(*engine.transform(), WorldTransform::identity());
    }

    #[test]
    fn test_non_finite_adjustment_is_discarded() {
        let mut engine = AnchorEngine::new(&Config::default()).unwrap();
        let adj = ManualAdjustment {
            rotation_z_rad: f32::NAN,
            ..ManualAdjustment::default()
        };
        let outcome = engine.tick(Some(&torso_frame()), adj);
        assert!(matches!(outcome, TickOutcome::Held { reason: HoldReason::Corrupt, .. }));
        assert_eq!(*engine.transform(), WorldTransform::identity());
    }

    #[test]
    fn test_scale_stays_bounded_over_many_ticks() {
        let mut engine = AnchorEngine::new(&Config::default()).unwrap();
        for i in 0..200 {
            let spread = 1.0 + (i as f32 * 37.0) % 600.0;
            let frame = LandmarkFrame::new(640, 480)
                .with(KeypointIndex::LeftShoulder, Keypoint::new(320.0 + spread, 100.0, 0.9))
                .with(KeypointIndex::RightShoulder, Keypoint::new(320.0 - spread, 120.0, 0.9))
                .with(KeypointIndex::LeftHip, Keypoint::new(330.0, 100.0 + spread * 3.0, 0.9))
                .with(KeypointIndex::RightHip, Keypoint::new(310.0, 100.0 + spread * 3.0, 0.9));
            let adj = ManualAdjustment {
                scale_multiplier: (i % 7) as f32,
                uniform_scale: i % 2 == 0,
                ..ManualAdjustment::default()
            };
            let t = *engine.tick(Some(&frame), adj).transform();
            assert!(t.scale.iter().all(|s| (0.2..=5.0).contains(s)), "tick {}: {:?}", i, t.scale);
            assert!(t.rotation_z.is_finite());
        }
    }

    #[test]
    fn test_mirror_flips_position_not_rotation() {
        let frame = LandmarkFrame::new(640, 480)
            .with(KeypointIndex::LeftShoulder, Keypoint::new(500.0, 190.0, 0.9))
            .with(KeypointIndex::RightShoulder, Keypoint::new(380.0, 210.0, 0.9));

        let mut plain = AnchorEngine::new(&instant_config()).unwrap();
        let mut config = instant_config();
        config.display.mirror_x = true;
        let mut mirrored = AnchorEngine::new(&config).unwrap();

        let a = *plain.tick(Some(&frame), ManualAdjustment::default()).transform();
        let b = *mirrored.tick(Some(&frame), ManualAdjustment::default()).transform();
        assert!(approx_eq_f32(a.position.x, -b.position.x, 1e-5));
        assert!(approx_eq_f32(a.position.y, b.position.y, 1e-5));
        assert_eq!(a.rotation_z, b.rotation_z);
        assert!(approx_eq_f32(a.scale.x, b.scale.x, 1e-5));
    }

    #[test]
    fn test_narrower_asset_grows_scale() {
        let mut engine = AnchorEngine::new(&instant_config()).unwrap();
        let before = engine.tick(Some(&torso_frame()), ManualAdjustment::default()).transform().scale.x;

        engine.set_bounds(ObjectBounds::new(0.5, 1.2));
        let after = engine.tick(Some(&torso_frame()), ManualAdjustment::default()).transform().scale.x;
        assert!(approx_eq_f32(after, before * 2.0, 1e-5), "{} vs {}", after, before);
    }

    #[test]
    fn test_tiny_shoulder_width_keeps_scale() {
        let mut engine = AnchorEngine::new(&instant_config()).unwrap();
        let t1 = *engine.tick(Some(&torso_frame()), ManualAdjustment::default()).transform();

        // 投影後の肩幅が 1e-4 を下回る
        let frame = LandmarkFrame::new(640, 480)
            .with(KeypointIndex::LeftShoulder, Keypoint::new(320.01, 200.0, 0.9))
            .with(KeypointIndex::RightShoulder, Keypoint::new(320.0, 200.0, 0.9));
        let adj = ManualAdjustment {
            rotation_z_rad: 0.4,
            ..ManualAdjustment::default()
        };
        let outcome = engine.tick(Some(&frame), adj);
        let TickOutcome::Updated { transform, strategy, .. } = outcome else {
            panic!("expected update, got {:?}", outcome);
        };
        assert_eq!(strategy, AnchorStrategy::ShouldersOnly);
        assert_eq!(transform.scale, t1.scale);
        assert!(approx_eq_f32(transform.rotation_z, 0.4, 1e-6));
        assert!(transform.position.y > t1.position.y);
    }

    #[test]
    fn test_invalid_scale_limits_rejected() {
        let mut config = Config::default();
        config.anchor.min_scale = 5.0;
        config.anchor.max_scale = 0.2;
        assert!(AnchorEngine::new(&config).is_err());

        let mut config = Config::default();
        config.anchor.max_scale = f32::NAN;
        assert!(AnchorEngine::new(&config).is_err());
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut engine = AnchorEngine::new(&Config::default()).unwrap();
        engine.tick(Some(&torso_frame()), ManualAdjustment::default());
        engine.reset();
        assert_eq!(*engine.transform(), WorldTransform::identity());
    }
}
