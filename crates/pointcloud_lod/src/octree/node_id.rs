//! NodeId - immutable value type naming a position in the octree.
//!
//! The id is a decimal path code: the root is `1`, and descending into
//! octant `d` (0-7) appends the digit `d + 1`. The number of decimal digits
//! is therefore `depth + 1`, and the parent is found by dropping the last
//! digit.

use std::fmt;

/// Deepest level whose ids still fit in a `u64` (19 decimal digits).
pub const MAX_SUPPORTED_DEPTH: u32 = 18;

/// Hierarchical path code of an octree node.
///
/// Ordering is numeric, so every node sorts after all nodes with fewer
/// digits. Load queues rely on this for coarse-to-fine ordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(u64);

impl NodeId {
  /// The root node.
  pub const ROOT: NodeId = NodeId(1);

  /// Wrap a raw id. No validation is performed; see [`NodeId::validate`].
  pub const fn new(raw: u64) -> Self {
    Self(raw)
  }

  /// Raw numeric value.
  pub const fn raw(self) -> u64 {
    self.0
  }

  pub fn is_root(self) -> bool {
    self.0 == 1
  }

  /// Depth below the root (root = 0), i.e. `floor(log10(id))`.
  pub fn depth(self) -> u32 {
    if self.0 == 0 {
      return 0;
    }
    self.0.ilog10()
  }

  /// Parent id, or `None` for the root.
  pub fn parent(self) -> Option<Self> {
    if self.0 < 10 {
      return None;
    }
    Some(Self(self.0 / 10))
  }

  /// Octant digit (0-7) this node occupies inside its parent.
  pub fn octant(self) -> Option<u8> {
    if self.0 < 10 {
      return None;
    }
    match (self.0 % 10) as u8 {
      0 | 9 => None,
      d => Some(d - 1),
    }
  }

  /// Child id for octant `0..8`.
  ///
  /// Returns `None` for an out-of-range octant or when the child would be
  /// deeper than [`MAX_SUPPORTED_DEPTH`].
  pub fn child(self, octant: u8) -> Option<Self> {
    if octant > 7 || self.depth() >= MAX_SUPPORTED_DEPTH {
      return None;
    }
    Some(Self(self.0 * 10 + octant as u64 + 1))
  }

  /// Check that the id is a well-formed path code.
  ///
  /// The leading digit must be 1 and every following digit must be in
  /// `1..=8`.
  pub fn validate(self) -> Result<(), &'static str> {
    if self.0 == 0 {
      return Err("id 0 is not a path code");
    }
    let mut rest = self.0;
    while rest >= 10 {
      let digit = rest % 10;
      if !(1..=8).contains(&digit) {
        return Err("octant digit outside 1..=8");
      }
      rest /= 10;
    }
    if rest != 1 {
      return Err("path code must start with the root digit 1");
    }
    Ok(())
  }
}

/// Octant digit for a geometric split position.
///
/// `(x, y, z)` are render-space half indices (0 = lower half). The digit
/// packs them as `(x, z, y)`: the point-cloud source stores z-up, so its
/// second bit is the render-space z axis and its third bit the vertical.
#[inline]
pub fn octant_for_split(x: u8, y: u8, z: u8) -> u8 {
  ((x & 1) << 2) | ((z & 1) << 1) | (y & 1)
}

/// Inverse of [`octant_for_split`]: returns render-space `(x, y, z)`.
#[inline]
pub fn split_for_octant(octant: u8) -> (u8, u8, u8) {
  ((octant >> 2) & 1, octant & 1, (octant >> 1) & 1)
}

impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<u64> for NodeId {
  fn from(raw: u64) -> Self {
    Self(raw)
  }
}

#[cfg(test)]
#[path = "node_id_test.rs"]
mod node_id_test;
