/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::types::Fovf;
use crate::types::Posef;

use euclid::RigidTransform3D;
use euclid::Rotation3D;
use euclid::Transform3D;
use euclid::Vector3D;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClipPlanes {
    pub near: f32,
    pub far: f32,
    /// Was there an update that the renderer hasn't seen yet?
    update: bool,
}

impl Default for ClipPlanes {
    fn default() -> Self {
        ClipPlanes {
            near: 0.1,
            far: 1000.,
            update: false,
        }
    }
}

impl ClipPlanes {
    pub fn new(near: f32, far: f32) -> Self {
        ClipPlanes {
            near,
            far,
            update: false,
        }
    }

    pub fn update(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.update = true;
    }

    /// Checks for and clears the pending update flag
    pub fn recently_updated(&mut self) -> bool {
        std::mem::replace(&mut self.update, false)
    }
}

/// The rigid transform described by a runtime pose.
pub fn pose_to_transform<Src, Dst>(pose: &Posef) -> RigidTransform3D<f32, Src, Dst> {
    let rotation = Rotation3D::quaternion(
        pose.orientation.x,
        pose.orientation.y,
        pose.orientation.z,
        pose.orientation.w,
    );
    let translation = Vector3D::new(pose.position.x, pose.position.y, pose.position.z);
    RigidTransform3D::new(rotation, translation)
}

/// Approximates a head pose halfway between two eye poses.
pub fn lerp_poses<Src, Dst>(left: &Posef, right: &Posef) -> RigidTransform3D<f32, Src, Dst> {
    let left: RigidTransform3D<f32, Src, Dst> = pose_to_transform(left);
    let right: RigidTransform3D<f32, Src, Dst> = pose_to_transform(right);

    let rotation = left.rotation.lerp(&right.rotation, 0.5);
    let translation = left.translation.lerp(right.translation, 0.5);

    RigidTransform3D::new(rotation, translation)
}

/// An off-axis perspective projection for an asymmetric field of view.
#[inline]
pub fn fov_to_projection_matrix<T, U>(fov: &Fovf, clip_planes: ClipPlanes) -> Transform3D<f32, T, U> {
    let near = clip_planes.near;
    let far = clip_planes.far;
    let left = fov.angle_left.tan() * near;
    let right = fov.angle_right.tan() * near;
    let top = fov.angle_up.tan() * near;
    let bottom = fov.angle_down.tan() * near;

    let w = right - left;
    let h = top - bottom;
    let d = far - near;

    Transform3D::new(
        2. * near / w,
        0.,
        0.,
        0.,
        0.,
        2. * near / h,
        0.,
        0.,
        (right + left) / w,
        (top + bottom) / h,
        -(far + near) / d,
        -1.,
        0.,
        0.,
        -2. * far * near / d,
        0.,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Display;
    use crate::view::Eye;
    use euclid::Point3D;

    #[test]
    fn symmetric_fov_maps_near_corner_to_ndc_corner() {
        let angle = std::f32::consts::FRAC_PI_4;
        let fov = Fovf {
            angle_left: -angle,
            angle_right: angle,
            angle_up: angle,
            angle_down: -angle,
        };
        let planes = ClipPlanes::new(1., 100.);
        let projection: Transform3D<f32, Eye, Display> = fov_to_projection_matrix(&fov, planes);
        let corner = projection
            .transform_point3d(Point3D::new(1., 1., -1.))
            .unwrap();
        assert!((corner.x - 1.).abs() < 1e-5);
        assert!((corner.y - 1.).abs() < 1e-5);
        assert!((corner.z + 1.).abs() < 1e-5);
    }

    #[test]
    fn clip_plane_update_is_reported_once() {
        let mut planes = ClipPlanes::default();
        assert!(!planes.recently_updated());
        planes.update(0.5, 50.);
        assert!(planes.recently_updated());
        assert!(!planes.recently_updated());
        assert_eq!(planes.near, 0.5);
    }

    #[test]
    fn identity_pose_is_identity_transform() {
        let t: RigidTransform3D<f32, Eye, Display> = pose_to_transform(&Posef::IDENTITY);
        assert_eq!(t.translation, Vector3D::zero());
    }
}
