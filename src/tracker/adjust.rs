use nalgebra::{Point2, Vector2, Vector3};
use serde::Deserialize;

use super::fit::ScaleLimits;

/// ユーザーが UI で設定する手動補正
///
/// エンジンはティック開始時のスナップショットを読むだけで、書き換えない。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ManualAdjustment {
    /// 水平オフセット（画像幅に対する割合）
    #[serde(default)]
    pub offset_x_norm: f32,
    /// 垂直オフセット（画像高さに対する割合、下が正）
    #[serde(default)]
    pub offset_y_norm: f32,
    #[serde(default = "default_scale_multiplier")]
    pub scale_multiplier: f32,
    /// 追加のZ回転（ラジアン）
    #[serde(default)]
    pub rotation_z_rad: f32,
    /// true なら Y/Z スケールも X に合わせる
    #[serde(default)]
    pub uniform_scale: bool,
}

fn default_scale_multiplier() -> f32 { 1.0 }

impl Default for ManualAdjustment {
    fn default() -> Self {
        Self {
            offset_x_norm: 0.0,
            offset_y_norm: 0.0,
            scale_multiplier: default_scale_multiplier(),
            rotation_z_rad: 0.0,
            uniform_scale: false,
        }
    }
}

impl ManualAdjustment {
    /// オフセットをピクセルに換算
    pub fn offset_px(&self, image_width: u32, image_height: u32) -> Vector2<f32> {
        Vector2::new(
            self.offset_x_norm * image_width as f32,
            self.offset_y_norm * image_height as f32,
        )
    }

    /// 画像空間の角度はワールドの回転と向きが逆なので符号を反転してから足す
    pub fn rotation_for(&self, yaw_rad: f32) -> f32 {
        -yaw_rad + self.rotation_z_rad
    }
}

/// 補正前の配置目標
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementTarget {
    /// 表示空間の画像座標（投影前）
    pub position_img: Point2<f32>,
    /// フィットスケール。None はスケール更新なし
    pub scale_world: Option<Vector3<f32>>,
    /// None は回転更新なし
    pub yaw_rad: Option<f32>,
}

/// 補正後の配置目標
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedTarget {
    pub position_img: Point2<f32>,
    pub scale_world: Option<Vector3<f32>>,
    pub rotation_z: Option<f32>,
}

/// 手動補正を重ねる
///
/// 状態を持たない純粋関数。スケールは倍率を掛けた後に limits へ収める。
pub fn apply_override(
    target: &PlacementTarget,
    adjustment: &ManualAdjustment,
    image_width: u32,
    image_height: u32,
    limits: &ScaleLimits,
) -> AdjustedTarget {
    AdjustedTarget {
        position_img: target.position_img + adjustment.offset_px(image_width, image_height),
        scale_world: target
            .scale_world
            .map(|s| limits.clamp_vec(s * adjustment.scale_multiplier)),
        rotation_z: target.yaw_rad.map(|yaw| adjustment.rotation_for(yaw)),
    }
}
