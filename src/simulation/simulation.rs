use crate::bounding_box::BoundingBox;
use crate::concurrency::{par_iter_mut1, par_iter_mut2, par_iter_mut3, par_iter_mut4};
use crate::neighborhood_search::NeighborhoodGrid;
use crate::simulation_parameters::{SceneConfig, SimulationParams};
use crate::solver::FluidSolver;
use crate::{floating_type_mod::FT, vec3f, vec4f, V3, V4};

use nalgebra::zero;
use num_traits::Float;

use std::collections::HashMap;
use std::fmt::{Display, Write};
use std::mem;
use std::time::{Duration, Instant};

/// Reference density of the particle-mass invariant: a particle's mass is
/// the mass of water filling its bounding cube, independent of the solver's
/// configurable rest density.
pub const REST_DENSITY_REFERENCE: FT = 1000.;

macro_rules! decl_particle_vec {
    (pub struct $struct_name:ident { $(pub $field_name:ident: Vec<$field_type:ty> | $default_value:expr),*$(,)?  }) => {
        pub struct $struct_name {
            $(
                pub $field_name : Vec<$field_type>,
            )*
        }

        impl $struct_name {
            pub fn default(len: usize) -> Self {
                Self {
                    $(
                        $field_name: (0..len).map(|_| $default_value).collect::<Vec<$field_type>>(),
                    )*
                }
            }
        }
    }
}

decl_particle_vec! {
    pub struct ParticleVec {
        pub mass: Vec<FT> | 0.,
        pub radius: Vec<FT> | 0.,

        pub position: Vec<V3> | zero(),
        pub predicted: Vec<V3> | zero(),
        pub position_update: Vec<V3> | zero(),

        pub velocity: Vec<V3> | zero(),
        pub velocity_temp: Vec<V3> | zero(),
        pub ext_force: Vec<V3> | zero(),

        // per-iteration scratch written by the lambda pass
        pub density: Vec<FT> | 0.,
        pub lambda: Vec<FT> | 0.,

        // visualization only
        pub color: Vec<V4> | zero(),
    }
}

#[derive(Clone)]
struct Counter<T> {
    values: Vec<T>,
    last_start: Instant,
}

impl<T> Counter<T> {
    fn new() -> Self {
        Counter::<T> {
            last_start: Instant::now(),
            values: Vec::new(),
        }
    }

    fn add_value(&mut self, v: T) {
        self.values.push(v);
    }
}

impl Counter<FT> {
    fn avg(&self) -> FT {
        self.values.iter().cloned().sum::<FT>() / self.values.len() as FT
    }
    fn min(&self) -> FT {
        self.values.iter().cloned().fold(FT::max_value(), FT::min)
    }
    fn max(&self) -> FT {
        self.values.iter().cloned().fold(FT::min_value(), FT::max)
    }
}

impl Counter<Duration> {
    fn begin(&mut self) {
        self.last_start = Instant::now();
    }

    fn end(&mut self) {
        self.values.push(Instant::now() - self.last_start);
    }

    fn avg(&self) -> Duration {
        self.values.iter().cloned().sum::<Duration>() / self.values.len() as u32
    }

    fn sum(&self) -> Duration {
        self.values.iter().cloned().sum::<Duration>()
    }
}

struct ValueCounters {
    counters: HashMap<String, Counter<FT>>,
    enabled: bool,
}

impl ValueCounters {
    fn new(enabled: bool) -> ValueCounters {
        ValueCounters {
            counters: HashMap::default(),
            enabled,
        }
    }

    fn add_value(&mut self, id: &str, v: FT) {
        if self.enabled {
            self.counters
                .entry(id.to_string())
                .or_insert_with(Counter::<FT>::new)
                .add_value(v);
        }
    }
}

struct PerformanceCounters {
    counters: HashMap<String, Counter<Duration>>,
    enabled: bool,
}

impl PerformanceCounters {
    fn new(enabled: bool) -> PerformanceCounters {
        PerformanceCounters {
            counters: HashMap::default(),
            enabled,
        }
    }

    fn begin(&mut self, id: &str) {
        if self.enabled {
            self.counters
                .entry(id.to_string())
                .or_insert_with(Counter::<Duration>::new)
                .begin();
        }
    }

    fn end(&mut self, id: &str) {
        if self.enabled {
            self.counters.get_mut(id).unwrap().end();
        }
    }
}

/**
 * The simulation aggregate: owns the particle state, the bounding box, the
 * neighbor grid and the solver, and advances everything by one fixed time
 * step per `single_step` call.
 *
 * Every phase of a step is a data-parallel fan-out where each particle
 * index is written by exactly one worker; the fan-outs are
 * barrier-separated, so a phase only ever reads the completed output of
 * the previous one (Jacobi-style iteration).
 */
pub struct FluidSystem {
    pub particles: ParticleVec,

    bounding_box: BoundingBox,
    grid: NeighborhoodGrid,
    solver: FluidSolver,
    params: SimulationParams,

    simulate: bool,
    waves: bool,
    wave_phase: FT,
    // +x extent the wave oscillation swings back to
    rest_max_x: FT,

    step_number: usize,

    pcounters: PerformanceCounters,
    vcounters: ValueCounters,
}

impl FluidSystem {
    pub fn new(params: SimulationParams, scene: &SceneConfig, counters_enabled: bool) -> FluidSystem {
        assert!(params.particle_radius > 0.);
        assert!(scene.boundary.min.len() == 3 && scene.boundary.max.len() == 3);

        let bounding_box = BoundingBox::new(
            scene.boundary.min[0],
            scene.boundary.max[0],
            scene.boundary.min[1],
            scene.boundary.max[1],
            scene.boundary.min[2],
            scene.boundary.max[2],
        );

        let mut positions = Vec::new();
        for block in &scene.blocks {
            assert!(block.origin.len() == 3 && block.count.len() == 3);
            let origin = vec3f(block.origin[0], block.origin[1], block.origin[2]);
            for x in 0..block.count[0] {
                for z in 0..block.count[2] {
                    for y in 0..block.count[1] {
                        positions.push(origin + block.spacing * vec3f(x as FT, y as FT, z as FT));
                    }
                }
            }
        }

        let num_particles = positions.len();
        println!("spawned {} particles", num_particles);

        let mut particles = ParticleVec::default(num_particles);
        particles.position = positions;

        let diameter = 2. * params.particle_radius;
        for i in 0..num_particles {
            particles.radius[i] = params.particle_radius;
            particles.mass[i] = diameter * diameter * diameter * REST_DENSITY_REFERENCE;
            particles.color[i] = vec4f(0., 0.62745, 0.690196, 1.);
        }

        let grid = NeighborhoodGrid::new(
            &bounding_box,
            num_particles,
            params.max_neighbors,
            params.smoothing_length(),
            params.particle_radius,
        );

        let rest_max_x = bounding_box.max_x;

        FluidSystem {
            particles,
            grid,
            solver: FluidSolver::new(&params),
            bounding_box,
            params,
            simulate: false,
            waves: false,
            wave_phase: 0.,
            rest_max_x,
            step_number: 0,
            pcounters: PerformanceCounters::new(counters_enabled),
            vcounters: ValueCounters::new(counters_enabled),
        }
    }

    pub fn num_particles(&self) -> usize {
        self.particles.position.len()
    }

    pub fn particles(&self) -> &ParticleVec {
        &self.particles
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn num_steps(&self) -> usize {
        self.step_number
    }

    pub fn set_simulate(&mut self, simulate: bool) {
        self.simulate = simulate;
    }

    pub fn set_waves(&mut self, waves: bool) {
        self.waves = waves;
    }

    /// Advance the simulation by one fixed time step. Does nothing while
    /// the simulation is paused.
    pub fn single_step(&mut self) {
        if !self.simulate {
            return;
        }

        self.pcounters.begin("simulation-step");

        if self.waves {
            // piston-like oscillation of the +x wall
            self.wave_phase += self.params.wave_phase_increment;
            self.bounding_box.max_x =
                self.rest_max_x - self.wave_phase.sin().abs() * self.params.wave_amplitude;
            self.bounding_box.build_walls();
        }

        let dt = self.params.timestep;
        let solver = &self.solver;

        // integrate external forces, predict positions, clear the updates
        self.pcounters.begin("predict");
        par_iter_mut4(
            &mut self.particles.velocity,
            &mut self.particles.predicted,
            &mut self.particles.ext_force,
            &mut self.particles.position_update,
            |i, velocity, predicted, ext_force, position_update| {
                solver.predict_position(self.particles.position[i], velocity, predicted, ext_force, dt);
                *position_update = V3::zeros();
            },
        );
        self.pcounters.end("predict");

        self.pcounters.begin("neighbor-search");
        self.grid.build_table(&self.particles.position);
        self.pcounters.end("neighbor-search");

        self.pcounters.begin("constraint-iterations");
        for _iter in 0..self.params.solver_iterations {
            let grid = &self.grid;

            // density constraint multipliers
            par_iter_mut3(
                &mut self.particles.density,
                &mut self.particles.lambda,
                &mut self.particles.color,
                |i, density, lambda, color| {
                    let (d, l, c) = solver.compute_lambda(
                        i,
                        &self.particles.predicted,
                        &self.particles.mass,
                        grid.neighbors(i),
                    );
                    *density = d;
                    *lambda = l;
                    *color = c;
                },
            );

            // position corrections from one consistent snapshot of the
            // predicted positions
            par_iter_mut1(&mut self.particles.position_update, |i, position_update| {
                *position_update = solver.position_update(
                    i,
                    &self.particles.predicted,
                    &self.particles.lambda,
                    grid.neighbors(i),
                );
            });

            // wall collisions
            par_iter_mut2(
                &mut self.particles.predicted,
                &mut self.particles.velocity,
                |i, predicted, velocity| {
                    solver.collide(&self.bounding_box, predicted, velocity, self.particles.radius[i]);
                },
            );

            // apply the corrections
            par_iter_mut1(&mut self.particles.predicted, |i, predicted| {
                *predicted += self.particles.position_update[i];
            });
        }
        self.pcounters.end("constraint-iterations");

        self.pcounters.begin("velocity-update");

        // the step's velocity is whatever movement the projection left over
        par_iter_mut1(&mut self.particles.velocity, |i, velocity| {
            *velocity = (self.particles.predicted[i] - self.particles.position[i]) / dt;
        });

        // vorticity confinement and XSPH viscosity read the full velocity
        // generation just written, so the smoothed velocities go through a
        // temporary and are swapped in afterwards
        {
            let grid = &self.grid;
            par_iter_mut2(
                &mut self.particles.velocity_temp,
                &mut self.particles.ext_force,
                |i, velocity_temp, ext_force| {
                    let (smoothed_velocity, confinement) = solver.vorticity_and_xsph(
                        i,
                        &self.particles.predicted,
                        &self.particles.velocity,
                        &self.particles.density,
                        grid.neighbors(i),
                    );
                    *velocity_temp = smoothed_velocity;
                    *ext_force += confinement;
                },
            );
        }
        mem::swap(&mut self.particles.velocity, &mut self.particles.velocity_temp);

        // commit the projected positions
        par_iter_mut1(&mut self.particles.position, |i, position| {
            *position = self.particles.predicted[i];
        });

        self.pcounters.end("velocity-update");

        self.grid.clean_table();

        if self.vcounters.enabled {
            let num_particles = self.num_particles();
            let mean_speed = self.particles.velocity.iter().map(|v| v.norm()).sum::<FT>()
                / num_particles as FT;
            let max_density = self
                .particles
                .density
                .iter()
                .cloned()
                .fold(FT::min_value(), FT::max);
            self.vcounters.add_value("mean-speed", mean_speed);
            self.vcounters.add_value("max-density", max_density);
        }

        self.step_number += 1;
        self.pcounters.end("simulation-step");
    }
}

pub fn write_statistics(fluid_system: &FluidSystem) -> String {
    let mut s = String::new();

    writeln!(s, "simulated steps: {}", fluid_system.num_steps()).unwrap();
    writeln!(
        s,
        "simulation-time: {}ms",
        fluid_system
            .pcounters
            .counters
            .get("simulation-step")
            .unwrap()
            .sum()
            .as_secs_f64()
            * 1000.
    )
    .unwrap();
    writeln!(s).unwrap();

    let mut v = fluid_system.pcounters.counters.clone().into_iter().collect::<Vec<_>>();
    v.sort_by(|x, y| x.0.cmp(&y.0));
    for (label, pcounter) in v {
        writeln!(s, "{}: avg:{}ms", label, pcounter.avg().as_secs_f64() * 1000.).unwrap();
    }
    writeln!(s).unwrap();

    let mut v = fluid_system.vcounters.counters.clone().into_iter().collect::<Vec<_>>();
    v.sort_by(|x, y| x.0.cmp(&y.0));
    for (label, vcounter) in v {
        writeln!(
            s,
            "{}: min:{} max:{} avg:{}",
            label,
            vcounter.min(),
            vcounter.max(),
            vcounter.avg()
        )
        .unwrap();
    }

    s
}

pub fn is_ft_approx_eq<FT: Float>(a: FT, b: FT, tolerance: FT) -> bool {
    assert!(!a.is_nan());
    assert!(!b.is_nan());
    b <= a + tolerance && b >= a - tolerance
}

pub fn assert_ft_approx_eq<FT: Float + Display>(a: FT, b: FT, tolerance: FT, s: impl FnOnce() -> String) {
    if !is_ft_approx_eq(a, b, tolerance) {
        panic!(
            "{} value not equal with a tolerance of {}:\n\ta={}\n\tb={}\n",
            s(),
            tolerance,
            a,
            b
        );
    }
}
