use crate::config::SmoothConfig;
use crate::transform::WorldTransform;

/// 成分ごとの平滑化係数（1.0 = 即座に追従、0.0 = 動かない）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingAlphas {
    pub position: f32,
    pub scale: f32,
    pub rotation: f32,
}

impl SmoothingAlphas {
    pub fn uniform(alpha: f32) -> Self {
        Self {
            position: alpha,
            scale: alpha,
            rotation: alpha,
        }
    }
}

impl From<&SmoothConfig> for SmoothingAlphas {
    fn from(config: &SmoothConfig) -> Self {
        Self {
            position: config.position,
            scale: config.scale,
            rotation: config.rotation,
        }
    }
}

/// EMAベースで previous を target へ近づける
///
/// 位置・スケール: 軸ごとのEMA
/// 回転: スカラーのEMA（角度の折り返しはしない）
pub fn smooth(previous: &WorldTransform, target: &WorldTransform, alpha: SmoothingAlphas) -> WorldTransform {
    WorldTransform::new(
        previous.position + (target.position - previous.position) * alpha.position,
        previous.scale + (target.scale - previous.scale) * alpha.scale,
        previous.rotation_z + (target.rotation_z - previous.rotation_z) * alpha.rotation,
    )
}

/// 適用中の変換をティックをまたいで保持するEMA平滑化フィルタ
pub struct TransformSmoother {
    alpha: SmoothingAlphas,
    current: WorldTransform,
}

impl TransformSmoother {
    pub fn new(alpha: SmoothingAlphas, initial: WorldTransform) -> Self {
        Self {
            alpha,
            current: initial,
        }
    }

    pub fn from_config(config: &SmoothConfig) -> Self {
        Self::new(config.into(), WorldTransform::identity())
    }

    pub fn current(&self) -> &WorldTransform {
        &self.current
    }

    /// target へ近づけて結果を保持する
    pub fn apply(&mut self, target: &WorldTransform) -> WorldTransform {
        self.current = smooth(&self.current, target, self.alpha);
        self.current
    }

    /// このティックは変換をそのまま保持
    pub fn hold(&self) -> WorldTransform {
        self.current
    }

    pub fn reset(&mut self, initial: WorldTransform) {
        self.current = initial;
    }
}
