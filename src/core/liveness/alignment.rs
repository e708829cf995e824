// src/core/liveness/alignment.rs
use serde::{Deserialize, Serialize};

use crate::utils::config::LivenessConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Face bounding box in pixel coordinates of the analysis frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Face position normalised to the frame: centre in [0, 1] and half-extents
/// as a fraction of the frame width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceGeometry {
    pub center_x: f32,
    pub center_y: f32,
    pub radius_x: f32,
    pub radius_y: f32,
}

impl FaceGeometry {
    pub fn new(center_x: f32, center_y: f32, radius_x: f32, radius_y: f32) -> Self {
        Self {
            center_x,
            center_y,
            radius_x,
            radius_y,
        }
    }

    /// `None` for a zero-sized frame.
    pub fn from_box(face: &FaceBox, dims: FrameDimensions) -> Option<Self> {
        if dims.width == 0 || dims.height == 0 {
            return None;
        }
        let width = dims.width as f32;
        let height = dims.height as f32;

        Some(Self {
            center_x: (face.left + face.right) / 2.0 / width,
            center_y: (face.top + face.bottom) / 2.0 / height,
            radius_x: (face.right - face.left).abs() / width / 2.0,
            radius_y: (face.bottom - face.top).abs() / height / 2.0,
        })
    }
}

/// On-screen capture zone a face has to sit in.
///
/// The centre sits below the middle of the frame because front cameras
/// frame the face high.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentTarget {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
    pub min_radius_y: f32,
    pub max_radius_y: f32,
}

impl Default for AlignmentTarget {
    fn default() -> Self {
        Self {
            center_x: 0.5,
            center_y: 0.65,
            radius: 0.40,
            min_radius_y: 0.22,
            max_radius_y: 0.50,
        }
    }
}

impl From<&LivenessConfig> for AlignmentTarget {
    fn from(config: &LivenessConfig) -> Self {
        Self {
            center_x: config.target_center_x as f32,
            center_y: config.target_center_y as f32,
            radius: config.target_radius as f32,
            min_radius_y: config.min_radius_y as f32,
            max_radius_y: config.max_radius_y as f32,
        }
    }
}

impl AlignmentTarget {
    pub fn distance(&self, face: &FaceGeometry) -> f32 {
        let dx = face.center_x - self.center_x;
        let dy = face.center_y - self.center_y;
        (dx * dx + dy * dy).sqrt()
    }

    /// The whole face fits inside the target circle and its height is in
    /// the accepted band (not too far away, not too close).
    pub fn is_aligned(&self, face: &FaceGeometry) -> bool {
        let extent = face.radius_x.max(face.radius_y);
        self.distance(face) + extent < self.radius
            && face.radius_y > self.min_radius_y
            && face.radius_y < self.max_radius_y
    }

    /// Evaluates one analysis frame. Only the first reported face counts.
    pub fn evaluate(&self, faces: &[FaceBox], dims: FrameDimensions) -> bool {
        faces
            .first()
            .and_then(|face| FaceGeometry::from_box(face, dims))
            .map(|geometry| self.is_aligned(&geometry))
            .unwrap_or(false)
    }
}
