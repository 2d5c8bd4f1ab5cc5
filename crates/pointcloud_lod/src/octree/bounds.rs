//! Axis-aligned bounding boxes and spheres in render space (double precision).

use glam::DVec3;

use super::node_id::split_for_octant;

/// Double-precision axis-aligned bounding box.
///
/// Render space is y-up. Point-cloud sources are usually z-up; use
/// [`DAabb3::from_z_up`] to convert a source box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DAabb3 {
  /// Minimum corner (inclusive).
  pub min: DVec3,
  /// Maximum corner (inclusive).
  pub max: DVec3,
}

impl DAabb3 {
  /// Create a new AABB from min and max corners.
  ///
  /// # Panics
  /// Debug-asserts that min <= max on all axes.
  pub fn new(min: DVec3, max: DVec3) -> Self {
    debug_assert!(
      min.x <= max.x && min.y <= max.y && min.z <= max.z,
      "AABB min must be <= max on all axes"
    );
    Self { min, max }
  }

  /// Convert a z-up source box into y-up render space.
  pub fn from_z_up(min: DVec3, max: DVec3) -> Self {
    Self::new(DVec3::new(min.x, min.z, min.y), DVec3::new(max.x, max.z, max.y))
  }

  /// Get the size of the AABB (max - min).
  #[inline]
  pub fn size(&self) -> DVec3 {
    self.max - self.min
  }

  /// Get the center of the AABB.
  #[inline]
  pub fn center(&self) -> DVec3 {
    (self.min + self.max) * 0.5
  }

  /// Box of one of the 8 equal octants, addressed by octant digit.
  pub fn octant(&self, octant: u8) -> DAabb3 {
    let (x, y, z) = split_for_octant(octant);
    let half = self.size() * 0.5;
    let min = self.min + DVec3::new(x as f64, y as f64, z as f64) * half;
    DAabb3 { min, max: min + half }
  }

  /// Circumscribed sphere.
  pub fn bounding_sphere(&self) -> BoundingSphere {
    BoundingSphere {
      center: self.center(),
      radius: self.size().length() * 0.5,
    }
  }
}

/// Sphere used for distance and screen-size estimates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
  pub center: DVec3,
  pub radius: f64,
}
