pub mod bounding_box;
pub mod concurrency;
pub mod neighborhood_search;
pub mod simulation_parameters;
pub mod solver;
pub mod sph_kernels;
pub mod simulation;

pub type IT = i32;

#[cfg(feature = "double-precision")]
pub mod floating_type_mod {
    pub type FT = f64;
    pub use std::f64::consts::{FRAC_1_PI, PI};
}

#[cfg(not(feature = "double-precision"))]
pub mod floating_type_mod {
    pub type FT = f32;
    pub use std::f32::consts::{FRAC_1_PI, PI};
}

use floating_type_mod::FT;

use nalgebra::SVector;

pub type V<T, const D: usize> = SVector<T, D>;

pub type V3 = V<FT, 3>;
pub type V4 = V<FT, 4>;
pub type VI3 = V<IT, 3>;

pub fn vec3f(x: FT, y: FT, z: FT) -> V3 {
    [x, y, z].into()
}

pub fn vec4f(x: FT, y: FT, z: FT, w: FT) -> V4 {
    [x, y, z, w].into()
}

pub fn vec3i(x: IT, y: IT, z: IT) -> VI3 {
    [x, y, z].into()
}

pub use simulation::*;
