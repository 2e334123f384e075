use crate::{floating_type_mod::FT, vec3f, V3};

/**
 * One face of the simulation box. The normal points into the interior and
 * `d = -normal . centre`, so `normal . p + d` is the signed distance of a
 * point from the face (positive inside).
 */
#[derive(Debug, Clone, Copy)]
pub struct Wall {
    pub centre: V3,
    pub normal: V3,
    pub d: FT,
}

impl Wall {
    fn new(edge_a: V3, edge_b: V3, centre: V3) -> Wall {
        let mut normal = edge_a.cross(&edge_b);
        normal.normalize_mut();
        Wall {
            centre,
            normal,
            d: -normal.dot(&centre),
        }
    }

    /// Signed distance of a sphere with the given radius from this wall.
    /// Negative means the sphere penetrates the wall by that amount.
    pub fn signed_distance(&self, p: V3, radius: FT) -> FT {
        self.normal.dot(&p) + self.d - radius
    }
}

/**
 * Axis-aligned box bounding the simulation. Collision response works
 * against the six derived walls; `build_walls` must be called again after
 * any extent changes (wave mode animates `max_x`).
 */
#[derive(Debug, Clone)]
pub struct BoundingBox {
    pub min_x: FT,
    pub max_x: FT,
    pub min_y: FT,
    pub max_y: FT,
    pub min_z: FT,
    pub max_z: FT,

    walls: [Wall; 6],
}

impl BoundingBox {
    pub fn new(min_x: FT, max_x: FT, min_y: FT, max_y: FT, min_z: FT, max_z: FT) -> BoundingBox {
        assert!(min_x < max_x, "degenerate bounding box on the x-axis");
        assert!(min_y < max_y, "degenerate bounding box on the y-axis");
        assert!(min_z < max_z, "degenerate bounding box on the z-axis");

        let zero_wall = Wall {
            centre: V3::zeros(),
            normal: V3::zeros(),
            d: 0.,
        };
        let mut bb = BoundingBox {
            min_x,
            max_x,
            min_y,
            max_y,
            min_z,
            max_z,
            walls: [zero_wall; 6],
        };
        bb.build_walls();
        bb
    }

    pub fn walls(&self) -> &[Wall; 6] {
        &self.walls
    }

    pub fn size(&self) -> V3 {
        vec3f(
            self.max_x - self.min_x,
            self.max_y - self.min_y,
            self.max_z - self.min_z,
        )
    }

    pub fn min(&self) -> V3 {
        vec3f(self.min_x, self.min_y, self.min_z)
    }

    pub fn centre(&self) -> V3 {
        vec3f(
            (self.min_x + self.max_x) / 2.,
            (self.min_y + self.max_y) / 2.,
            (self.min_z + self.max_z) / 2.,
        )
    }

    /**
     * Derive the six walls from the current extents. Corner numbering:
     *
     *        2_____________6
     *       /|            /|
     *     3/_|__________7/ |
     *     |  |          |  |
     *     |  |          |  |
     *     |  |0_________|__|4
     *     | /           | /
     *     |/____________|/
     *     1              5
     *
     * Each normal is the cross product of two in-plane edges, ordered so
     * that it points into the box interior.
     */
    pub fn build_walls(&mut self) {
        let p = [
            vec3f(self.min_x, self.min_y, self.min_z),
            vec3f(self.min_x, self.min_y, self.max_z),
            vec3f(self.min_x, self.max_y, self.min_z),
            vec3f(self.min_x, self.max_y, self.max_z),
            vec3f(self.max_x, self.min_y, self.min_z),
            vec3f(self.max_x, self.min_y, self.max_z),
            vec3f(self.max_x, self.max_y, self.min_z),
            vec3f(self.max_x, self.max_y, self.max_z),
        ];

        let half_x = (self.min_x + self.max_x) / 2.;
        let half_y = (self.min_y + self.max_y) / 2.;
        let half_z = (self.min_z + self.max_z) / 2.;

        self.walls = [
            // floor (-y face)
            Wall::new(p[5] - p[1], p[0] - p[1], vec3f(half_x, self.min_y, half_z)),
            // -x face
            Wall::new(p[2] - p[0], p[1] - p[0], vec3f(self.min_x, half_y, half_z)),
            // +z face
            Wall::new(p[3] - p[1], p[5] - p[1], vec3f(half_x, half_y, self.max_z)),
            // +x face
            Wall::new(p[7] - p[5], p[4] - p[5], vec3f(self.max_x, half_y, half_z)),
            // -z face
            Wall::new(p[6] - p[4], p[0] - p[4], vec3f(half_x, half_y, self.min_z)),
            // ceiling (+y face)
            Wall::new(p[7] - p[6], p[2] - p[6], vec3f(half_x, self.max_y, half_z)),
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_ft_approx_eq;

    fn default_box() -> BoundingBox {
        BoundingBox::new(-8., 6., -10., 10., -6.5, 2.)
    }

    #[test]
    fn all_walls_point_inward() {
        let bb = default_box();
        let centre = bb.centre();

        for wall in bb.walls() {
            assert!(
                wall.normal.dot(&centre) + wall.d > 0.,
                "wall with normal {:?} does not face the box centre",
                wall.normal
            );
        }
    }

    #[test]
    fn wall_normals_are_axis_aligned_units() {
        let bb = default_box();
        let expected = [
            vec3f(0., 1., 0.),
            vec3f(1., 0., 0.),
            vec3f(0., 0., -1.),
            vec3f(-1., 0., 0.),
            vec3f(0., 0., 1.),
            vec3f(0., -1., 0.),
        ];

        for (wall, expected_normal) in bb.walls().iter().zip(expected.iter()) {
            assert!((wall.normal - expected_normal).norm() < 1e-6);
            assert_ft_approx_eq(wall.normal.norm(), 1., 1e-6, || format!("|normal|"));
        }
    }

    #[test]
    fn signed_distance_against_floor() {
        let bb = default_box();
        let floor = &bb.walls()[0];
        let radius = 0.125;

        // resting exactly on the floor
        let dist = floor.signed_distance(vec3f(0., -10. + radius, 0.), radius);
        assert_ft_approx_eq(dist, 0., 1e-5, || format!("resting distance"));

        // penetrating by 0.1
        let dist = floor.signed_distance(vec3f(0., -10. + radius - 0.1, 0.), radius);
        assert_ft_approx_eq(dist, -0.1, 1e-5, || format!("penetration distance"));

        // well inside
        assert!(floor.signed_distance(vec3f(0., 0., 0.), radius) > 0.);
    }

    #[test]
    fn rebuilding_walls_tracks_a_moved_extent() {
        let mut bb = default_box();
        bb.max_x = 3.;
        bb.build_walls();

        let piston = &bb.walls()[3];
        assert!((piston.normal - vec3f(-1., 0., 0.)).norm() < 1e-6);
        assert_ft_approx_eq(piston.d, 3., 1e-5, || format!("piston plane offset"));

        // a point that used to be interior is now past the moved wall
        assert!(piston.signed_distance(vec3f(5., 0., 0.), 0.125) < 0.);
    }

    #[test]
    #[should_panic]
    fn zero_extent_box_is_rejected() {
        BoundingBox::new(-1., -1., 0., 1., 0., 1.);
    }
}
