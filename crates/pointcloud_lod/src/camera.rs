//! Camera input for visibility classification.
//!
//! The host renderer owns the real camera; each frame it hands the engine a
//! [`CameraState`] snapshot. Frustum planes are extracted from the
//! view-projection matrix, which assumes glam's `[0, 1]` clip depth range
//! (`DMat4::perspective_rh` / `perspective_lh`).

use glam::{DMat4, DVec3, DVec4, UVec2};

use crate::octree::DAabb3;

/// Camera snapshot supplied by the host each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
  /// Projection * view.
  pub view_projection: DMat4,
  /// Viewport size in pixels.
  pub viewport: UVec2,
  /// Camera position in render space.
  pub position: DVec3,
  /// Vertical field of view in radians.
  pub fov_y: f64,
}

impl CameraState {
  /// Right-handed, y-up perspective camera looking at `target`.
  pub fn look_at(
    position: DVec3,
    target: DVec3,
    fov_y: f64,
    viewport: UVec2,
    near: f64,
    far: f64,
  ) -> Self {
    let aspect = viewport.x.max(1) as f64 / viewport.y.max(1) as f64;
    let view = DMat4::look_at_rh(position, target, DVec3::Y);
    let projection = DMat4::perspective_rh(fov_y, aspect, near, far);
    Self {
      view_projection: projection * view,
      viewport,
      position,
      fov_y,
    }
  }

  pub fn frustum(&self) -> Frustum {
    Frustum::from_view_projection(&self.view_projection)
  }
}

/// Plane `normal . p + d = 0`, normal pointing into the frustum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
  pub normal: DVec3,
  pub d: f64,
}

impl Plane {
  fn from_row(v: DVec4) -> Self {
    let normal = v.truncate();
    let len = normal.length();
    if len <= f64::EPSILON {
      return Self { normal, d: v.w };
    }
    Self {
      normal: normal / len,
      d: v.w / len,
    }
  }

  #[inline]
  pub fn signed_distance(&self, point: DVec3) -> f64 {
    self.normal.dot(point) + self.d
  }
}

/// Six clip planes: left, right, bottom, top, near, far.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
  pub planes: [Plane; 6],
}

impl Frustum {
  /// Gribb/Hartmann plane extraction.
  pub fn from_view_projection(m: &DMat4) -> Self {
    let r0 = m.row(0);
    let r1 = m.row(1);
    let r2 = m.row(2);
    let r3 = m.row(3);
    Self {
      planes: [
        Plane::from_row(r3 + r0),
        Plane::from_row(r3 - r0),
        Plane::from_row(r3 + r1),
        Plane::from_row(r3 - r1),
        Plane::from_row(r2),
        Plane::from_row(r3 - r2),
      ],
    }
  }

  /// Conservative box test: false only when the box lies fully outside one
  /// plane.
  pub fn intersects_aabb(&self, aabb: &DAabb3) -> bool {
    self.planes.iter().all(|plane| {
      let positive = DVec3::new(
        if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
        if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
        if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
      );
      plane.signed_distance(positive) >= 0.0
    })
  }
}
