use nalgebra::{Matrix3, Vector3};

use crate::pose::{CameraSpacePoint, ColorSpacePoint};
use crate::sensor::CoordinateMapper;

/// ピンホールモデルによるカメラ空間 → カラー空間の変換
///
/// カメラ空間は深度カメラ原点（X右, Y上, Z前方, メートル）。
/// 深度カメラからカラーカメラへの外部パラメータ（回転・並進）を適用してから
/// 内部パラメータ K で投影する。
#[derive(Debug, Clone)]
pub struct PinholeMapper {
    intrinsic: Matrix3<f32>,
    rotation: Matrix3<f32>,
    translation: Vector3<f32>,
}

impl PinholeMapper {
    /// 垂直画角 + 解像度 + カラーカメラ位置/回転から構築
    ///
    /// - fov_v_deg: 垂直画角（度）
    /// - color_offset: 深度カメラから見たカラーカメラの位置 [x, y, z] メートル
    /// - rotation_deg: カラーカメラの回転 [rx, ry, rz] 度 (Euler XYZ)
    pub fn from_config(
        fov_v_deg: f32,
        width: u32,
        height: u32,
        color_offset: [f32; 3],
        rotation_deg: [f32; 3],
    ) -> Self {
        let w = width as f32;
        let h = height as f32;

        let fy = h / (2.0 * (fov_v_deg.to_radians() / 2.0).tan());
        let fx = fy; // 正方ピクセルを仮定
        let intrinsic = Matrix3::new(fx, 0.0, w / 2.0, 0.0, fy, h / 2.0, 0.0, 0.0, 1.0);

        let rotation = euler_xyz(rotation_deg);
        // t = -R * position
        let translation = -(rotation * Vector3::new(color_offset[0], color_offset[1], color_offset[2]));

        Self {
            intrinsic,
            rotation,
            translation,
        }
    }

    /// 外部パラメータなし（深度カメラとカラーカメラが同一視点）
    pub fn aligned(fov_v_deg: f32, width: u32, height: u32) -> Self {
        Self::from_config(fov_v_deg, width, height, [0.0; 3], [0.0; 3])
    }

    pub fn focal_length(&self) -> (f32, f32) {
        (self.intrinsic[(0, 0)], self.intrinsic[(1, 1)])
    }
}

impl CoordinateMapper for PinholeMapper {
    /// カラーカメラの後ろにある点は (-inf, -inf) を返す
    fn map_camera_point_to_color_space(&self, point: CameraSpacePoint) -> ColorSpacePoint {
        let p = self.rotation * Vector3::new(point.x, point.y, point.z) + self.translation;
        if p.z <= 0.0 {
            return ColorSpacePoint::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        }

        // カメラY（上が正）→ 画像Y（下が正）
        let uvw = self.intrinsic * Vector3::new(p.x, -p.y, p.z);
        ColorSpacePoint::new(uvw.x / uvw.z, uvw.y / uvw.z)
    }
}

/// Euler XYZ（度）から回転行列 R = Rz * Ry * Rx
fn euler_xyz(rotation_deg: [f32; 3]) -> Matrix3<f32> {
    let rx = rotation_deg[0].to_radians();
    let ry = rotation_deg[1].to_radians();
    let rz = rotation_deg[2].to_radians();

    let rot_x = Matrix3::new(1.0, 0.0, 0.0, 0.0, rx.cos(), -rx.sin(), 0.0, rx.sin(), rx.cos());
    let rot_y = Matrix3::new(ry.cos(), 0.0, ry.sin(), 0.0, 1.0, 0.0, -ry.sin(), 0.0, ry.cos());
    let rot_z = Matrix3::new(rz.cos(), -rz.sin(), 0.0, rz.sin(), rz.cos(), 0.0, 0.0, 0.0, 1.0);
    rot_z * rot_y * rot_x
}
