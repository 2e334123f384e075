use crate::{
    bounding_box::BoundingBox,
    concurrency::par_iter_mut1,
    floating_type_mod::FT,
    vec3f, vec3i, V3, VI3,
};

/// Cell offsets scanned around a particle's own cell. The final cell edge
/// can be slightly larger than a third of the query diameter, so the scan
/// reaches two cells out on every axis. The order matters: it decides which
/// candidates survive when a neighbor list reaches its capacity.
const CELL_OFFSETS: [i32; 5] = [0, 1, -1, 2, -2];

/**
 * Uniform-grid nearest-neighbor search over the simulation box.
 *
 * `build_table` buckets all particles into grid cells and fills one
 * neighbor list per particle; the lists stay valid until the next
 * `build_table` or `clean_table` call. Cell buckets and neighbor lists are
 * capacity-bounded; overflow silently drops candidates for the current
 * step.
 */
pub struct NeighborhoodGrid {
    query_radius: FT,
    max_neighbors: usize,
    max_particles_per_cell: usize,

    cells: VI3,
    cell_size: V3,
    grid_min: V3,

    // per-cell particle buckets; allocated once, cleared every step
    grid: Vec<Vec<u32>>,

    neighbors: Vec<Vec<u32>>,
}

impl NeighborhoodGrid {
    pub fn new(
        bb: &BoundingBox,
        particle_count: usize,
        max_neighbors: usize,
        query_radius: FT,
        particle_radius: FT,
    ) -> NeighborhoodGrid {
        let size = bb.size();

        // target a cell edge of a third of the query diameter, then stretch
        // the edges so whole cells exactly tile the box
        let target_edge = 2. * query_radius / 3.;
        let cells = vec3i(
            (size.x / target_edge).ceil() as i32,
            (size.y / target_edge).ceil() as i32,
            (size.z / target_edge).ceil() as i32,
        );
        let cell_size = vec3f(
            size.x / cells.x as FT,
            size.y / cells.y as FT,
            size.z / cells.z as FT,
        );

        let cell_count = (cells.x * cells.y * cells.z) as usize;
        let cell_volume = cell_size.x * cell_size.y * cell_size.z;
        let max_particles_per_cell =
            (cell_volume / (particle_radius * particle_radius * particle_radius)).ceil() as usize * 2;

        NeighborhoodGrid {
            query_radius,
            max_neighbors,
            max_particles_per_cell,
            cells,
            cell_size,
            grid_min: bb.min(),
            grid: (0..cell_count)
                .map(|_| Vec::with_capacity(max_particles_per_cell))
                .collect(),
            neighbors: (0..particle_count)
                .map(|_| Vec::with_capacity(max_neighbors))
                .collect(),
        }
    }

    fn cell_coords(&self, p: V3) -> VI3 {
        vec3i(
            ((p.x - self.grid_min.x) / self.cell_size.x).floor() as i32,
            ((p.y - self.grid_min.y) / self.cell_size.y).floor() as i32,
            ((p.z - self.grid_min.z) / self.cell_size.z).floor() as i32,
        )
    }

    /// Row-major cell index; `None` for coordinates outside the grid.
    fn cell_id(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        if x < 0 || x >= self.cells.x || y < 0 || y >= self.cells.y || z < 0 || z >= self.cells.z {
            return None;
        }
        Some(x as usize + y as usize * self.cells.x as usize + z as usize * (self.cells.x * self.cells.y) as usize)
    }

    /**
     * Bucket every particle into its cell, then rebuild all neighbor
     * lists. Particles outside the grid are skipped, as are particles
     * landing in an already-full cell; both simply go without neighbors
     * for this step.
     */
    pub fn build_table(&mut self, positions: &[V3]) {
        for (i, p) in positions.iter().enumerate() {
            let c = self.cell_coords(*p);
            if let Some(cell) = self.cell_id(c.x, c.y, c.z) {
                let bucket = &mut self.grid[cell];
                if bucket.len() < self.max_particles_per_cell {
                    bucket.push(i as u32);
                }
            }
        }

        self.build_neighbor_table(positions);
    }

    fn build_neighbor_table(&mut self, positions: &[V3]) {
        let radius_squared = self.query_radius * self.query_radius;
        let max_neighbors = self.max_neighbors;
        let grid = &self.grid;
        let grid_min = self.grid_min;
        let cell_size = self.cell_size;
        let cells = self.cells;

        let cell_id = |x: i32, y: i32, z: i32| -> Option<usize> {
            if x < 0 || x >= cells.x || y < 0 || y >= cells.y || z < 0 || z >= cells.z {
                return None;
            }
            Some(x as usize + y as usize * cells.x as usize + z as usize * (cells.x * cells.y) as usize)
        };

        par_iter_mut1(&mut self.neighbors, |a, neighbor_list| {
            neighbor_list.clear();

            let this_position = positions[a];
            let cx = ((this_position.x - grid_min.x) / cell_size.x).floor() as i32;
            let cy = ((this_position.y - grid_min.y) / cell_size.y).floor() as i32;
            let cz = ((this_position.z - grid_min.z) / cell_size.z).floor() as i32;

            for &i in &CELL_OFFSETS {
                for &j in &CELL_OFFSETS {
                    for &k in &CELL_OFFSETS {
                        let cell = match cell_id(cx + i, cy + j, cz + k) {
                            Some(cell) => cell,
                            None => continue,
                        };

                        for &p in &grid[cell] {
                            if p as usize == a {
                                continue;
                            }
                            if neighbor_list.len() < max_neighbors
                                && (this_position - positions[p as usize]).norm_squared() < radius_squared
                            {
                                neighbor_list.push(p);
                            }
                        }
                    }
                }
            }
        });
    }

    pub fn neighbors(&self, i: usize) -> &[u32] {
        &self.neighbors[i]
    }

    pub fn neighbor_count(&self, i: usize) -> usize {
        self.neighbors[i].len()
    }

    pub fn iter(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbors[i].iter().map(|&x| x as usize)
    }

    /// Empty all cell buckets. Neighbor lists are left as they are; their
    /// lengths stay authoritative until the next `build_table`.
    pub fn clean_table(&mut self) {
        for bucket in &mut self.grid {
            bucket.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3f;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(-1., 1., -1., 1., -1., 1.)
    }

    // query radius for the common particle radius of 0.125
    const QUERY_RADIUS: FT = 0.625;

    #[test]
    fn origin_lands_in_the_centre_cell() {
        let bb = unit_box();
        let grid = NeighborhoodGrid::new(&bb, 1, 150, QUERY_RADIUS, 0.125);

        // extent 2 and a target edge of 2 * 0.625 / 3 gives five cells per axis
        assert_eq!(grid.cells, vec3i(5, 5, 5));

        let c = grid.cell_coords(vec3f(0., 0., 0.));
        assert_eq!(c, vec3i(2, 2, 2));
        assert_eq!(grid.cell_id(c.x, c.y, c.z), Some(2 + 2 * 5 + 2 * 25));
    }

    #[test]
    fn out_of_range_cells_have_no_id() {
        let bb = unit_box();
        let grid = NeighborhoodGrid::new(&bb, 1, 150, QUERY_RADIUS, 0.125);

        assert_eq!(grid.cell_id(-1, 0, 0), None);
        assert_eq!(grid.cell_id(0, 5, 0), None);
        assert_eq!(grid.cell_id(0, 0, 17), None);
    }

    #[test]
    fn neighbors_are_within_the_query_radius() {
        let bb = unit_box();

        let mut positions = Vec::new();
        for x in 0..6 {
            for y in 0..6 {
                for z in 0..6 {
                    positions.push(vec3f(
                        -0.9 + 0.3 * x as FT,
                        -0.9 + 0.3 * y as FT,
                        -0.9 + 0.3 * z as FT,
                    ));
                }
            }
        }

        let mut grid = NeighborhoodGrid::new(&bb, positions.len(), 150, QUERY_RADIUS, 0.125);
        grid.build_table(&positions);

        for i in 0..positions.len() {
            assert!(!grid.neighbors(i).is_empty());
            for j in grid.iter(i) {
                assert!(j != i);
                assert!((positions[i] - positions[j]).norm() < QUERY_RADIUS);
            }
        }
    }

    #[test]
    fn unsaturated_neighborhoods_are_symmetric() {
        let bb = unit_box();

        let mut positions = Vec::new();
        for x in 0..5 {
            for y in 0..5 {
                positions.push(vec3f(-0.5 + 0.25 * x as FT, -0.5 + 0.25 * y as FT, 0.1));
            }
        }

        let mut grid = NeighborhoodGrid::new(&bb, positions.len(), 150, QUERY_RADIUS, 0.125);
        grid.build_table(&positions);

        for i in 0..positions.len() {
            assert!(grid.neighbor_count(i) < 150);
            for j in grid.iter(i) {
                assert!(
                    grid.iter(j).any(|k| k == i),
                    "particle {} sees {} but not the other way around",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn saturated_lists_keep_the_first_discovered_neighbors() {
        let bb = unit_box();

        // 200 particles packed into a ball far smaller than the query radius
        let mut positions = Vec::new();
        'fill: for x in 0..6 {
            for y in 0..6 {
                for z in 0..6 {
                    if positions.len() == 200 {
                        break 'fill;
                    }
                    positions.push(vec3f(0.02 * x as FT, 0.02 * y as FT, 0.02 * z as FT));
                }
            }
        }
        assert_eq!(positions.len(), 200);

        let max_neighbors = 10;
        let mut grid = NeighborhoodGrid::new(&bb, positions.len(), max_neighbors, QUERY_RADIUS, 0.125);
        grid.build_table(&positions);

        // the whole ball shares one cell, so discovery order is the bucket
        // fill order (particle index order) at the (0, 0, 0) offset: the
        // survivors must be exactly the first ten other particles, in order
        for i in 0..positions.len() {
            let expected: Vec<u32> = (0..positions.len() as u32)
                .filter(|&j| j != i as u32)
                .take(max_neighbors)
                .collect();
            assert_eq!(
                grid.neighbors(i),
                expected.as_slice(),
                "particle {} kept the wrong neighbors under saturation",
                i
            );
        }
    }

    #[test]
    fn saturation_prefers_the_cell_scan_order_over_proximity() {
        let bb = unit_box();

        // particle 0 sits right next to the +x edge of its cell: two
        // in-radius candidates share its cell, a third one just across the
        // cell boundary is far closer. The {0, +1, -1, +2, -2} scan
        // exhausts the cap in the home cell first, so the closest
        // candidate loses out.
        let positions = vec![
            vec3f(0.19, 0., 0.),
            vec3f(-0.15, 0., 0.),
            vec3f(-0.1, 0.05, 0.),
            vec3f(0.21, 0., 0.),
        ];

        let mut grid = NeighborhoodGrid::new(&bb, positions.len(), 2, QUERY_RADIUS, 0.125);
        grid.build_table(&positions);

        assert_eq!(grid.neighbors(0), &[1, 2]);
    }

    #[test]
    fn particles_outside_the_grid_are_not_indexed() {
        let bb = unit_box();

        let positions = vec![vec3f(0., 0., 0.), vec3f(0.2, 0., 0.), vec3f(-1.5, 0., 0.)];
        let mut grid = NeighborhoodGrid::new(&bb, positions.len(), 150, QUERY_RADIUS, 0.125);
        grid.build_table(&positions);

        // the two interior particles only see each other
        assert_eq!(grid.neighbors(0), &[1]);
        assert_eq!(grid.neighbors(1), &[0]);
    }

    #[test]
    fn clean_table_invalidates_the_buckets_only() {
        let bb = unit_box();

        let positions = vec![vec3f(0., 0., 0.), vec3f(0.1, 0., 0.)];
        let mut grid = NeighborhoodGrid::new(&bb, positions.len(), 150, QUERY_RADIUS, 0.125);

        grid.build_table(&positions);
        assert_eq!(grid.neighbor_count(0), 1);

        grid.clean_table();
        for bucket in &grid.grid {
            assert!(bucket.is_empty());
        }

        // a rebuild starts from clean buckets and finds the same neighbors
        grid.build_table(&positions);
        assert_eq!(grid.neighbors(0), &[1]);
    }
}
