use crate::{floating_type_mod::FT, vec3f, V3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationParams {
    pub rest_density: FT,

    pub particle_radius: FT,

    // the kernel support radius is smoothing_length_factor * particle_radius
    // and doubles as the neighbor query radius
    pub smoothing_length_factor: FT,

    pub solver_iterations: usize,
    pub max_neighbors: usize,

    pub timestep: FT,

    // y-component; gravity always acts straight down
    pub gravity: FT,

    // regularizer added to the constraint-gradient denominator of lambda
    pub relaxation: FT,

    // artificial pressure ("s_corr"): strength k, exponent n and the
    // reference distance expressed as a fraction of the support radius
    pub pressure_strength: FT,
    pub pressure_exponent: i32,
    pub pressure_radius_factor: FT,

    pub xsph_coefficient: FT,
    pub vorticity_strength: FT,

    pub restitution: FT,

    pub wave_amplitude: FT,
    pub wave_phase_increment: FT,
}

impl SimulationParams {
    pub fn smoothing_length(&self) -> FT {
        self.smoothing_length_factor * self.particle_radius
    }

    pub fn gravity_vector(&self) -> V3 {
        vec3f(0., self.gravity, 0.)
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            rest_density: 1000.,
            particle_radius: 0.125,
            smoothing_length_factor: 5.,
            solver_iterations: 3,
            max_neighbors: 150,
            timestep: 0.016,
            gravity: -9.81,
            relaxation: 0.0005,
            pressure_strength: 0.1,
            pressure_exponent: 4,
            pressure_radius_factor: 0.3,
            xsph_coefficient: 0.002,
            vorticity_strength: 0.01,
            restitution: 0.5,
            wave_amplitude: 5.,
            wave_phase_increment: 0.035,
        }
    }
}

/**
 * Extents of the simulation box. `min` and `max` are xyz triples with
 * `min < max` on every axis.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneBoundary {
    pub min: Vec<FT>,
    pub max: Vec<FT>,
}

/**
 * A lattice of seed particles: `count` particles per axis starting at
 * `origin`, `spacing` apart.
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneFluidBlock {
    pub origin: Vec<FT>,
    pub count: Vec<usize>,
    pub spacing: FT,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneConfig {
    pub boundary: SceneBoundary,
    pub blocks: Vec<SceneFluidBlock>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            boundary: SceneBoundary {
                min: vec![-8., -10., -6.5],
                max: vec![6., 10., 2.],
            },
            blocks: vec![SceneFluidBlock {
                origin: vec![-7.5, -7., -6.],
                count: vec![8, 16, 8],
                spacing: 0.24,
            }],
        }
    }
}
