use nalgebra::Vector3;

/// 衣服オブジェクトのワールド座標系での配置
///
/// フレーム間で保持される唯一の状態。Smootherだけが更新する。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    /// 位置 (x, y, z)
    pub position: Vector3<f32>,
    /// スケール (x, y, z)
    pub scale: Vector3<f32>,
    /// Z軸回転（ラジアン）
    pub rotation_z: f32,
}

impl WorldTransform {
    pub fn new(position: Vector3<f32>, scale: Vector3<f32>, rotation_z: f32) -> Self {
        Self {
            position,
            scale,
            rotation_z,
        }
    }

    /// 原点、等倍、回転なし
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation_z: 0.0,
        }
    }

    /// 全成分が有限値か（NaN/Infinityを含む結果は破棄する）
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.scale.iter().all(|v| v.is_finite())
            && self.rotation_z.is_finite()
    }

    /// スケール各成分を [min, max] に収める
    pub fn clamp_scale(mut self, min: f32, max: f32) -> Self {
        for v in self.scale.iter_mut() {
            *v = v.clamp(min, max);
        }
        self
    }
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::identity()
    }
}
