use lyon::geom::euclid::default::{Point3D, Transform3D};
use lyon::math::{Angle, Point};

/// A 4x4 transform applied in the vertex shader on top of the shape's positions.
///
/// Transforms are applied in call order: `GlTransform::identity().then_scale(2.0, 2.0).then_translate(1.0, 0.0)`
/// scales first and then translates. Positions live in shape space, so translations and pivots
/// are expressed in the same units as the shape's vertices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlTransform {
    matrix: Transform3D<f32>,
}

impl Default for GlTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl GlTransform {
    pub fn identity() -> Self {
        Self {
            matrix: Transform3D::identity(),
        }
    }

    pub fn from_matrix(matrix: Transform3D<f32>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &Transform3D<f32> {
        &self.matrix
    }

    pub fn is_identity(&self) -> bool {
        self.matrix == Transform3D::identity()
    }

    // ===== Translations =====

    pub fn translate(&mut self, tx: f32, ty: f32) {
        self.matrix = self.matrix.then(&Transform3D::translation(tx, ty, 0.0));
    }

    pub fn then_translate(mut self, tx: f32, ty: f32) -> Self {
        self.translate(tx, ty);
        self
    }

    // ===== Rotations =====

    /// Rotates around the z axis through `origin`.
    pub fn rotate(&mut self, angle: Angle, origin: Point) {
        let to_origin = Transform3D::translation(-origin.x, -origin.y, 0.0);
        let back = Transform3D::translation(origin.x, origin.y, 0.0);
        let rotation = Transform3D::rotation(0.0, 0.0, 1.0, angle);
        self.matrix = self.matrix.then(&to_origin).then(&rotation).then(&back);
    }

    pub fn then_rotate(mut self, angle: Angle, origin: Point) -> Self {
        self.rotate(angle, origin);
        self
    }

    // ===== Scaling =====

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.matrix = self.matrix.then(&Transform3D::scale(sx, sy, 1.0));
    }

    pub fn then_scale(mut self, sx: f32, sy: f32) -> Self {
        self.scale(sx, sy);
        self
    }

    /// Appends `other`, so the result applies `self` first and `other` second.
    pub fn combine_with(&self, other: &GlTransform) -> GlTransform {
        GlTransform {
            matrix: self.matrix.then(&other.matrix),
        }
    }

    /// Transforms a point. Returns `None` only for projective matrices that send the point
    /// behind the viewer, which the builders here never produce.
    pub fn apply_to(&self, position: Point3D<f32>) -> Option<Point3D<f32>> {
        self.matrix.transform_point3d(position)
    }

    pub fn apply_to_2d(&self, position: Point) -> Option<Point> {
        self.matrix.transform_point2d(position)
    }

    /// Column-major terms, laid out for a WGSL `mat4x4<f32>` multiplied as `m * v`.
    pub fn to_uniform(&self) -> [f32; 16] {
        self.matrix.to_array()
    }
}

impl From<Transform3D<f32>> for GlTransform {
    fn from(matrix: Transform3D<f32>) -> Self {
        Self::from_matrix(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyon::math::point;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a - b).length() < 1e-4,
            "expected {:?} to be close to {:?}",
            a,
            b
        );
    }

    #[test]
    fn operations_apply_in_call_order() {
        let scale_then_move = GlTransform::identity()
            .then_scale(2.0, 2.0)
            .then_translate(1.0, 0.0);
        assert_close(
            scale_then_move.apply_to_2d(point(1.0, 1.0)).unwrap(),
            point(3.0, 2.0),
        );

        let move_then_scale = GlTransform::identity()
            .then_translate(1.0, 0.0)
            .then_scale(2.0, 2.0);
        assert_close(
            move_then_scale.apply_to_2d(point(1.0, 1.0)).unwrap(),
            point(4.0, 2.0),
        );
    }

    #[test]
    fn rotation_keeps_the_origin_fixed() {
        let origin = point(5.0, 5.0);
        let t = GlTransform::identity().then_rotate(Angle::degrees(90.0), origin);
        assert_close(t.apply_to_2d(origin).unwrap(), origin);
        assert_close(t.apply_to_2d(point(6.0, 5.0)).unwrap(), point(5.0, 6.0));
    }

    #[test]
    fn combine_matches_chained_calls() {
        let a = GlTransform::identity().then_translate(3.0, -1.0);
        let b = GlTransform::identity().then_scale(0.5, 4.0);
        let combined = a.combine_with(&b);
        let chained = a.then_scale(0.5, 4.0);
        assert_eq!(combined, chained);
    }

    #[test]
    fn uniform_has_translation_in_last_column() {
        let t = GlTransform::identity().then_translate(0.25, 0.75);
        let m = t.to_uniform();
        assert_eq!(&m[12..16], &[0.25, 0.75, 0.0, 1.0]);
        assert!(GlTransform::default().is_identity());
    }
}
