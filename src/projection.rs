use nalgebra::{Isometry3, Perspective3, Point2, Point3, Vector3};
use thiserror::Error;

/// 光線と基準平面が平行とみなす |direction.z| の下限
pub const RAY_EPSILON: f32 = 1e-6;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ProjectionError {
    #[error("ray is parallel to the reference plane (direction.z = {0})")]
    DegenerateRay(f32),
    #[error("invalid image size {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
    #[error("invalid camera parameters")]
    InvalidCamera,
}

/// 透視投影カメラ
///
/// カメラは (0, 0, position_z) に置かれ、-Z 方向（基準平面 z=0）を向く。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    /// 垂直画角（ラジアン）
    pub fov_y_rad: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position_z: f32,
}

impl CameraModel {
    pub fn new(fov_y_rad: f32, aspect: f32, near: f32, far: f32, position_z: f32) -> Self {
        Self {
            fov_y_rad,
            aspect,
            near,
            far,
            position_z,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        Point3::new(0.0, 0.0, self.position_z)
    }

    /// パラメータ検証。Perspective3 はゼロアスペクト等で panic するので先に弾く
    ///
    /// カメラは基準平面の手前 (position_z > 0) になければならない。
    pub fn validate(&self) -> Result<(), ProjectionError> {
        let finite = [self.fov_y_rad, self.aspect, self.near, self.far, self.position_z]
            .iter()
            .all(|v| v.is_finite());
        if !finite
            || self.fov_y_rad <= 0.0
            || self.fov_y_rad >= std::f32::consts::PI
            || self.aspect <= 0.0
            || self.near <= 0.0
            || self.far <= self.near
            || self.position_z <= 0.0
        {
            return Err(ProjectionError::InvalidCamera);
        }
        Ok(())
    }

    fn perspective(&self) -> Perspective3<f32> {
        Perspective3::new(self.aspect, self.fov_y_rad, self.near, self.far)
    }

    fn view_to_world(&self) -> Isometry3<f32> {
        Isometry3::translation(0.0, 0.0, self.position_z)
    }
}

impl Default for CameraModel {
    /// fovY=45°, aspect=1, z=2
    fn default() -> Self {
        Self::new(45f32.to_radians(), 1.0, 0.1, 100.0, 2.0)
    }
}

/// 画像ピクセル座標を基準平面 z=0 上のワールド座標に変換する
///
/// 1. ピクセル → NDC
/// 2. near面上の点を逆投影してカメラからの光線を得る
/// 3. 光線と z=0 の交点
///
/// 状態を持たず、同じ入力には常に同じ出力を返す。
pub fn project_to_plane(
    pixel_x: f32,
    pixel_y: f32,
    image_width: u32,
    image_height: u32,
    camera: &CameraModel,
) -> Result<Vector3<f32>, ProjectionError> {
    if image_width == 0 || image_height == 0 {
        return Err(ProjectionError::InvalidImageSize {
            width: image_width,
            height: image_height,
        });
    }
    camera.validate()?;

    let ndc_x = (pixel_x / image_width as f32) * 2.0 - 1.0;
    let ndc_y = -((pixel_y / image_height as f32) * 2.0 - 1.0);

    let on_near = camera.perspective().unproject_point(&Point3::new(ndc_x, ndc_y, -1.0));
    let world = camera.view_to_world().transform_point(&on_near);
    let origin = camera.position();
    let direction = (world - origin).normalize();

    if !(direction.z.abs() >= RAY_EPSILON) {
        return Err(ProjectionError::DegenerateRay(direction.z));
    }

    // 交点はカメラの前方 (t > 0) に限る
    let t = -camera.position_z / direction.z;
    if !(t > 0.0) {
        return Err(ProjectionError::DegenerateRay(direction.z));
    }
    Ok(origin.coords + direction * t)
}

/// 表示空間（ミラー表示時はX反転）での画像座標
///
/// Anchor Selector は元画像座標のまま扱い、反転は投影とオーバーレイの直前でだけ行う。
pub fn to_view(point: Point2<f32>, image_width: u32, mirror_x: bool) -> Point2<f32> {
    if mirror_x {
        Point2::new(image_width as f32 - point.x, point.y)
    } else {
        point
    }
}
