use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::projection::CameraModel;
use crate::tracker::{ManualAdjustment, ObjectBounds, ScaleLimits};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub anchor: AnchorConfig,
    #[serde(default)]
    pub smooth: SmoothConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub garment: GarmentConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    /// 起動時の手動補正値
    #[serde(default)]
    pub adjust: ManualAdjustment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorConfig {
    /// 肩の信頼度閾値（これを超えたものだけ使う）
    #[serde(default = "default_shoulder_confidence_min")]
    pub shoulder_confidence_min: f32,
    /// 腰の信頼度閾値
    #[serde(default = "default_hip_confidence_min")]
    pub hip_confidence_min: f32,
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
    /// 腰が見えないときの下げ幅（肩幅に対する割合）
    #[serde(default = "default_hip_drop_fraction")]
    pub hip_drop_fraction: f32,
    /// 腰が見えるときの下げ幅（肩→腰の距離に対する割合）
    #[serde(default = "default_torso_drop_fraction")]
    pub torso_drop_fraction: f32,
    /// 腰が見えるときの追加の下げ幅（肩幅に対する割合）
    #[serde(default = "default_torso_drop_offset_fraction")]
    pub torso_drop_offset_fraction: f32,
    /// 全戦略共通の追加の下げ幅（ピクセル）
    #[serde(default)]
    pub anchor_offset_px: f32,
}

fn default_shoulder_confidence_min() -> f32 { 0.3 }
fn default_hip_confidence_min() -> f32 { 0.2 }
fn default_min_scale() -> f32 { 0.2 }
fn default_max_scale() -> f32 { 5.0 }
fn default_hip_drop_fraction() -> f32 { 0.6 }
fn default_torso_drop_fraction() -> f32 { 0.5 }
fn default_torso_drop_offset_fraction() -> f32 { 0.1 }

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            shoulder_confidence_min: default_shoulder_confidence_min(),
            hip_confidence_min: default_hip_confidence_min(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            hip_drop_fraction: default_hip_drop_fraction(),
            torso_drop_fraction: default_torso_drop_fraction(),
            torso_drop_offset_fraction: default_torso_drop_offset_fraction(),
            anchor_offset_px: 0.0,
        }
    }
}

impl AnchorConfig {
    pub fn scale_limits(&self) -> ScaleLimits {
        ScaleLimits::new(self.min_scale, self.max_scale)
    }
}

/// 平滑化係数（1.0 = 平滑化なし）
#[derive(Debug, Clone, Deserialize)]
pub struct SmoothConfig {
    #[serde(default = "default_smooth_position")]
    pub position: f32,
    #[serde(default = "default_smooth_scale")]
    pub scale: f32,
    #[serde(default = "default_smooth_rotation")]
    pub rotation: f32,
}

fn default_smooth_position() -> f32 { 0.5 }
fn default_smooth_scale() -> f32 { 0.35 }
fn default_smooth_rotation() -> f32 { 0.5 }

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            position: default_smooth_position(),
            scale: default_smooth_scale(),
            rotation: default_smooth_rotation(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// 垂直画角（度）
    #[serde(default = "default_fov_y_deg")]
    pub fov_y_deg: f32,
    #[serde(default = "default_aspect")]
    pub aspect: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    /// カメラのZ位置（基準平面 z=0 からの距離）
    #[serde(default = "default_position_z")]
    pub position_z: f32,
}

fn default_fov_y_deg() -> f32 { 45.0 }
fn default_aspect() -> f32 { 1.0 }
fn default_near() -> f32 { 0.1 }
fn default_far() -> f32 { 100.0 }
fn default_position_z() -> f32 { 2.0 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: default_fov_y_deg(),
            aspect: default_aspect(),
            near: default_near(),
            far: default_far(),
            position_z: default_position_z(),
        }
    }
}

impl CameraConfig {
    pub fn to_model(&self) -> CameraModel {
        CameraModel::new(
            self.fov_y_deg.to_radians(),
            self.aspect,
            self.near,
            self.far,
            self.position_z,
        )
    }
}

/// 衣服アセットのバウンディングボックス（ワールド単位）
#[derive(Debug, Clone, Deserialize)]
pub struct GarmentConfig {
    #[serde(default = "default_garment_width")]
    pub width: f32,
    #[serde(default = "default_garment_height")]
    pub height: f32,
}

fn default_garment_width() -> f32 { 1.0 }
fn default_garment_height() -> f32 { 1.2 }

impl Default for GarmentConfig {
    fn default() -> Self {
        Self {
            width: default_garment_width(),
            height: default_garment_height(),
        }
    }
}

impl GarmentConfig {
    pub fn bounds(&self) -> ObjectBounds {
        ObjectBounds::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// 映像を鏡像表示しているか（投影とオーバーレイの前にX反転）
    #[serde(default)]
    pub mirror_x: bool,
    /// オーバーレイに描くキーポイントの信頼度閾値
    #[serde(default = "default_overlay_confidence_min")]
    pub overlay_confidence_min: f32,
    /// オーバーレイ面の幅（0 = 元画像と同じ）
    #[serde(default)]
    pub width: u32,
    /// オーバーレイ面の高さ（0 = 元画像と同じ）
    #[serde(default)]
    pub height: u32,
}

fn default_overlay_confidence_min() -> f32 { 0.3 }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mirror_x: false,
            overlay_confidence_min: default_overlay_confidence_min(),
            width: 0,
            height: 0,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// 読み込みに失敗したらデフォルト設定を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("using default config: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let a = &self.anchor;
        for (name, v) in [
            ("anchor.shoulder_confidence_min", a.shoulder_confidence_min),
            ("anchor.hip_confidence_min", a.hip_confidence_min),
            ("display.overlay_confidence_min", self.display.overlay_confidence_min),
            ("smooth.position", self.smooth.position),
            ("smooth.scale", self.smooth.scale),
            ("smooth.rotation", self.smooth.rotation),
        ] {
            if !(0.0..=1.0).contains(&v) {
                bail!("{} must be within [0, 1], got {}", name, v);
            }
        }
        for (name, v) in [
            ("anchor.hip_drop_fraction", a.hip_drop_fraction),
            ("anchor.torso_drop_fraction", a.torso_drop_fraction),
            ("anchor.torso_drop_offset_fraction", a.torso_drop_offset_fraction),
            ("anchor.anchor_offset_px", a.anchor_offset_px),
        ] {
            if !v.is_finite() {
                bail!("{} must be finite, got {}", name, v);
            }
        }
        if !(a.min_scale > 0.0 && a.min_scale <= a.max_scale && a.max_scale.is_finite()) {
            bail!(
                "scale limits must satisfy 0 < min_scale <= max_scale, got [{}, {}]",
                a.min_scale,
                a.max_scale
            );
        }
        self.camera
            .to_model()
            .validate()
            .with_context(|| format!("invalid [camera] section: {:?}", self.camera))?;
        if !(self.garment.width > 0.0 && self.garment.height > 0.0) {
            bail!(
                "garment bounds must be positive, got {}x{}",
                self.garment.width,
                self.garment.height
            );
        }
        Ok(())
    }
}
