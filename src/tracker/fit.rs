use nalgebra::Vector3;

/// 衣服アセットのバウンディングボックス
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectBounds {
    pub width: f32,
    pub height: f32,
}

impl ObjectBounds {
    /// ゼロ除算防止の下限
    const MIN_EXTENT: f32 = 1e-6;

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn safe_width(&self) -> f32 {
        self.width.max(Self::MIN_EXTENT)
    }

    fn safe_height(&self) -> f32 {
        self.height.max(Self::MIN_EXTENT)
    }
}

/// スケールの許容範囲 [min, max]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLimits {
    pub min: f32,
    pub max: f32,
}

impl ScaleLimits {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, v: f32) -> f32 {
        v.clamp(self.min, self.max)
    }

    pub fn clamp_vec(&self, v: Vector3<f32>) -> Vector3<f32> {
        v.map(|c| self.clamp(c))
    }

    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v <= self.max
    }
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self::new(0.2, 5.0)
    }
}

/// 体の寸法（ワールド単位）から衣服のスケールを求める
///
/// - X: 肩幅 / アセット幅
/// - Y: 胴の高さ / アセット高さ（胴が測れなければ X と同じ）
/// - Z: uniform なら X、そうでなければ X と Y の平均
///
/// 全成分が limits 内に収まる。
pub fn fit_scale(
    shoulder_width_world: f32,
    torso_height_world: Option<f32>,
    bounds: &ObjectBounds,
    uniform: bool,
    limits: &ScaleLimits,
) -> Vector3<f32> {
    let scale_x = limits.clamp(shoulder_width_world / bounds.safe_width());
    let scale_y = match torso_height_world {
        Some(h) if !uniform => limits.clamp(h / bounds.safe_height()),
        _ => scale_x,
    };
    let scale_z = if uniform { scale_x } else { (scale_x + scale_y) / 2.0 };
    Vector3::new(scale_x, scale_y, scale_z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_independent_axes() {
        let s = fit_scale(0.5, Some(0.9), &ObjectBounds::new(1.0, 1.2), false, &ScaleLimits::default());
        assert!(approx_eq_f32(s.x, 0.5, 1e-6));
        assert!(approx_eq_f32(s.y, 0.75, 1e-6));
        assert!(approx_eq_f32(s.z, 0.625, 1e-6));
    }

    #[test]
    fn test_uniform_ignores_torso() {
        let s = fit_scale(0.5, Some(0.9), &ObjectBounds::new(1.0, 1.2), true, &ScaleLimits::default());
        assert_eq!(s, Vector3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_missing_torso_uses_width() {
        let s = fit_scale(0.8, None, &ObjectBounds::new(1.0, 1.2), false, &ScaleLimits::default());
        assert!(approx_eq_f32(s.y, 0.8, 1e-6));
        assert!(approx_eq_f32(s.z, 0.8, 1e-6));
    }

    #[test]
    fn test_extremes_are_clamped() {
        let limits = ScaleLimits::default();
        let bounds = ObjectBounds::new(1.0, 1.2);
        let tiny = fit_scale(1e-5, Some(1e-5), &bounds, false, &limits);
        let huge = fit_scale(1e5, Some(1e5), &bounds, false, &limits);
        assert_eq!(tiny, Vector3::new(0.2, 0.2, 0.2));
        assert_eq!(huge, Vector3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_zero_sized_asset_is_clamped() {
        let s = fit_scale(0.5, Some(0.5), &ObjectBounds::new(0.0, 0.0), false, &ScaleLimits::default());
        assert!(s.iter().all(|v| v.is_finite() && ScaleLimits::default().contains(*v)));
    }

    #[test]
    fn test_scale_stays_bounded_over_grid() {
        let limits = ScaleLimits::default();
        let bounds = ObjectBounds::new(1.0, 1.2);
        for i in 0..50 {
            for j in 0..50 {
                let width = i as f32 * 0.37;
                let torso = if j == 0 { None } else { Some(j as f32 * 0.41) };
                for uniform in [false, true] {
                    let s = fit_scale(width, torso, &bounds, uniform, &limits);
                    assert!(s.iter().all(|v| limits.contains(*v)), "{:?}", s);
                }
            }
        }
    }
}
