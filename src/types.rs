//! Input types shared by the verifier stages.
//!
//! Scene data arrives as a struct of arrays (positions, optional colors,
//! optional normals) the way sensor pipelines deliver it, while hypothesis
//! points use the generic [`PointRecord`].
use nalgebra::{Isometry3, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// 8-bit RGB triple.
pub type Rgb = [u8; 3];

/// Unit surface normal together with the local surface variation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceNormal {
    pub normal: Vector3<f32>,
    /// Surface variation `λ0 / (λ0 + λ1 + λ2)` in `[0, 1/3]`.
    pub curvature: f32,
}

impl SurfaceNormal {
    pub fn new(normal: Vector3<f32>, curvature: f32) -> Self {
        Self { normal, curvature }
    }

    pub fn is_finite(&self) -> bool {
        self.normal.iter().all(|v| v.is_finite()) && self.curvature.is_finite()
    }
}

/// Generic point representation used for hypothesis points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub position: Point3<f32>,
    pub normal: Option<SurfaceNormal>,
    pub color: Option<Rgb>,
}

impl PointRecord {
    pub fn new(position: Point3<f32>) -> Self {
        Self {
            position,
            normal: None,
            color: None,
        }
    }

    pub fn with_normal(mut self, normal: SurfaceNormal) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
    }

    /// Returns a copy moved by `pose`; the normal is rotated along.
    pub fn transformed(&self, pose: &Isometry3<f32>) -> Self {
        Self {
            position: pose.transform_point(&self.position),
            normal: self.normal.map(|n| SurfaceNormal {
                normal: pose.rotation.transform_vector(&n.normal),
                curvature: n.curvature,
            }),
            color: self.color,
        }
    }
}

/// Scene cloud as captured by the sensor, expressed in the camera frame
/// (camera at the origin).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SceneCloud {
    pub points: Vec<Point3<f32>>,
    #[serde(default)]
    pub colors: Option<Vec<Rgb>>,
    #[serde(default)]
    pub normals: Option<Vec<SurfaceNormal>>,
}

impl SceneCloud {
    pub fn new(points: Vec<Point3<f32>>) -> Self {
        Self {
            points,
            colors: None,
            normals: None,
        }
    }

    pub fn with_colors(mut self, colors: Vec<Rgb>) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn with_normals(mut self, normals: Vec<SurfaceNormal>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Object hypotheses come from the recognizer, planar ones from an external
/// plane segmentation. Both are verified with the same cost terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HypothesisKind {
    Object,
    Planar,
}

/// Candidate placement of a model in the scene.
///
/// `visible_points` are already expressed in the scene frame and pruned of
/// self- and scene-occluded points.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hypothesis {
    pub model_id: String,
    pub pose: Isometry3<f32>,
    pub visible_points: Vec<PointRecord>,
    pub outlier_weight: f32,
    pub kind: HypothesisKind,
}

impl Hypothesis {
    /// Build a hypothesis from points that are already in the scene frame.
    pub fn new(
        model_id: impl Into<String>,
        pose: Isometry3<f32>,
        visible_points: Vec<PointRecord>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            pose,
            visible_points,
            outlier_weight: 1.0,
            kind: HypothesisKind::Object,
        }
    }

    /// Build a hypothesis from model-frame points by applying `pose`.
    pub fn from_model(
        model_id: impl Into<String>,
        pose: Isometry3<f32>,
        model_points: &[PointRecord],
    ) -> Self {
        let visible_points = model_points.iter().map(|p| p.transformed(&pose)).collect();
        Self::new(model_id, pose, visible_points)
    }

    /// Planar hypothesis; planes carry no meaningful pose.
    pub fn planar(plane_id: impl Into<String>, points: Vec<PointRecord>) -> Self {
        Self {
            kind: HypothesisKind::Planar,
            ..Self::new(plane_id, Isometry3::identity(), points)
        }
    }

    pub fn with_outlier_weight(mut self, weight: f32) -> Self {
        self.outlier_weight = weight;
        self
    }

    pub fn is_planar(&self) -> bool {
        self.kind == HypothesisKind::Planar
    }
}
