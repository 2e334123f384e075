use crate::{
    bounding_box::BoundingBox,
    floating_type_mod::FT,
    simulation_parameters::SimulationParams,
    sph_kernels::{Poly6Kernel, SpikyKernel},
    vec4f, V3, V4,
};

/**
 * The density-constraint solver. Holds nothing but configuration and the
 * two kernels; every method computes one particle's share of one
 * simulation phase from the struct-of-arrays state, so the orchestrator
 * can fan the calls out freely.
 */
pub struct FluidSolver {
    inverse_rest_density: FT,
    relaxation: FT,

    pressure_strength: FT,
    pressure_exponent: i32,
    // W(pressure_radius), the denominator of the artificial pressure ratio
    pressure_reference_weight: FT,

    xsph_coefficient: FT,
    vorticity_strength: FT,
    restitution: FT,
    gravity: V3,

    poly6: Poly6Kernel,
    spiky: SpikyKernel,
}

impl FluidSolver {
    pub fn new(params: &SimulationParams) -> FluidSolver {
        let h = params.smoothing_length();
        let poly6 = Poly6Kernel::new(h);

        FluidSolver {
            inverse_rest_density: 1. / params.rest_density,
            relaxation: params.relaxation,
            pressure_strength: params.pressure_strength,
            pressure_exponent: params.pressure_exponent,
            pressure_reference_weight: poly6.weight(params.pressure_radius_factor * h),
            xsph_coefficient: params.xsph_coefficient,
            vorticity_strength: params.vorticity_strength,
            restitution: params.restitution,
            gravity: params.gravity_vector(),
            poly6,
            spiky: SpikyKernel::new(h),
        }
    }

    /// Integrate gravity and the accumulated external forces into the
    /// velocity, predict the new position and reset the forces. The
    /// external forces were written by the vorticity pass of the previous
    /// step, so confinement acts with one step of delay.
    pub fn predict_position(
        &self,
        position: V3,
        velocity: &mut V3,
        predicted: &mut V3,
        ext_force: &mut V3,
        dt: FT,
    ) {
        *velocity += self.gravity * dt + *ext_force * dt;
        *predicted = position + *velocity * dt;
        *ext_force = V3::zeros();
    }

    pub fn compute_density(&self, i: usize, predicted: &[V3], mass: &[FT], neighbors: &[u32]) -> FT {
        let mut density = 0.;
        for &j in neighbors {
            let j = j as usize;
            if j == i {
                continue;
            }
            density += mass[j] * self.poly6.weight((predicted[i] - predicted[j]).norm());
        }
        density
    }

    /**
     * Solve the density constraint `C = density / rest_density - 1` for one
     * particle: returns its density, its Lagrange multiplier and a
     * density-tinted visualization color. Under-dense particles get a zero
     * multiplier so free surfaces are not pulled together.
     */
    pub fn compute_lambda(&self, i: usize, predicted: &[V3], mass: &[FT], neighbors: &[u32]) -> (FT, FT, V4) {
        let density = self.compute_density(i, predicted, mass, neighbors);

        let d = density * self.inverse_rest_density;
        let color = vec4f(0.75 - d, 1. - 0.37255 * d, 1. - 0.309804 * d, 1.);

        let c = d - 1.;
        if c <= 0. {
            return (density, 0., color);
        }

        let mut sum_gradient_length_squared = 0.;
        let mut constraint_gradient = V3::zeros();

        for &j in neighbors {
            let j = j as usize;
            if j == i {
                continue;
            }

            let gradient =
                self.spiky.gradient(predicted[i] - predicted[j]) * (mass[j] * self.inverse_rest_density);

            sum_gradient_length_squared += gradient.dot(&gradient);
            constraint_gradient += gradient;
        }

        sum_gradient_length_squared += constraint_gradient.dot(&constraint_gradient);

        (
            density,
            -c / (sum_gradient_length_squared + self.relaxation),
            color,
        )
    }

    /// Tensile-instability correction: a small negative pressure term that
    /// keeps particles from clumping when their neighborhoods are sparse.
    pub fn artificial_pressure(&self, predicted_i: V3, predicted_j: V3) -> FT {
        let s = self.poly6.weight((predicted_i - predicted_j).norm()) / self.pressure_reference_weight;
        -self.pressure_strength * s.powi(self.pressure_exponent)
    }

    pub fn position_update(&self, i: usize, predicted: &[V3], lambda: &[FT], neighbors: &[u32]) -> V3 {
        let mut update = V3::zeros();

        for &j in neighbors {
            let j = j as usize;
            if j == i {
                continue;
            }

            let scorr = self.artificial_pressure(predicted[i], predicted[j]);
            update += self.spiky.gradient(predicted[i] - predicted[j]) * (lambda[i] + lambda[j] + scorr);
        }

        update * self.inverse_rest_density
    }

    /**
     * Push the predicted position back inside the box. The push-out is
     * twice the penetration depth, which over-corrects slightly but keeps
     * stacked particles from being squeezed through the walls. The
     * reflected velocity decomposes into normal and tangential parts that
     * are both scaled by the restitution, which collapses to damping the
     * whole vector.
     */
    pub fn collide(&self, bb: &BoundingBox, predicted: &mut V3, velocity: &mut V3, radius: FT) {
        for wall in bb.walls() {
            let dist = wall.signed_distance(*predicted, radius);
            if dist < 0. {
                *predicted -= wall.normal * (2. * dist);
                *velocity = -self.restitution * *velocity;
            }
        }
    }

    /**
     * Velocity post-processing for one particle: XSPH viscosity blends in
     * the kernel-weighted relative velocities of the neighborhood, and
     * vorticity confinement turns the local curl into an external force
     * for the next step. Returns the smoothed velocity and the confinement
     * force.
     *
     * The confinement direction uses the accumulated gradient scaled by
     * the curl magnitude rather than a true gradient of the curl field;
     * cheap, and enough to revive the splashes the projection damps out.
     */
    pub fn vorticity_and_xsph(
        &self,
        i: usize,
        predicted: &[V3],
        velocity: &[V3],
        density: &[FT],
        neighbors: &[u32],
    ) -> (V3, V3) {
        let mut vorticity = V3::zeros();
        let mut xsph_velocity = V3::zeros();

        for &j in neighbors {
            let j = j as usize;
            if j == i {
                continue;
            }

            let v_ij = velocity[j] - velocity[i];
            let p_ij = predicted[i] - predicted[j];

            vorticity += v_ij.cross(&self.spiky.gradient(p_ij));

            if density[j] != 0. {
                xsph_velocity += v_ij * self.poly6.weight(p_ij.norm());
            }
        }

        let smoothed_velocity = velocity[i] + self.xsph_coefficient * xsph_velocity;

        let mut confinement = V3::zeros();
        let vorticity_length = vorticity.norm();
        if vorticity_length != 0. {
            let mut gradient = V3::zeros();
            for &j in neighbors {
                let j = j as usize;
                if j == i {
                    continue;
                }
                gradient += self.spiky.gradient(predicted[i] - predicted[j]) * vorticity_length;
            }

            if gradient.norm_squared() != 0. {
                gradient.normalize_mut();
                confinement = gradient.cross(&vorticity) * self.vorticity_strength;
            }
        }

        (smoothed_velocity, confinement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_ft_approx_eq, vec3f};

    fn solver() -> FluidSolver {
        FluidSolver::new(&SimulationParams::default())
    }

    #[test]
    fn predicting_a_free_fall_step() {
        let s = solver();

        let mut velocity = V3::zeros();
        let mut predicted = V3::zeros();
        let mut ext_force = V3::zeros();
        s.predict_position(V3::zeros(), &mut velocity, &mut predicted, &mut ext_force, 0.016);

        assert_ft_approx_eq(velocity.y, -0.15696, 1e-5, || format!("velocity.y"));
        assert_ft_approx_eq(predicted.y, -0.00251136, 1e-6, || format!("predicted.y"));
        assert_eq!(velocity.x, 0.);
        assert_eq!(velocity.z, 0.);
    }

    #[test]
    fn external_forces_are_consumed_by_prediction() {
        let s = solver();

        let mut velocity = V3::zeros();
        let mut predicted = V3::zeros();
        let mut ext_force = vec3f(1., 9.81, 0.);
        s.predict_position(V3::zeros(), &mut velocity, &mut predicted, &mut ext_force, 0.016);

        // the force cancels gravity exactly and is reset afterwards
        assert_ft_approx_eq(velocity.y, 0., 1e-6, || format!("velocity.y"));
        assert_ft_approx_eq(velocity.x, 0.016, 1e-6, || format!("velocity.x"));
        assert_eq!(ext_force, V3::zeros());
    }

    #[test]
    fn artificial_pressure_at_the_reference_distance() {
        let s = solver();
        let h = SimulationParams::default().smoothing_length();

        // at exactly the reference distance the weight ratio is one
        let scorr = s.artificial_pressure(V3::zeros(), vec3f(0.3 * h, 0., 0.));
        assert_ft_approx_eq(scorr, -0.1, 1e-5, || format!("scorr"));

        // beyond the support radius the correction vanishes
        assert_eq!(s.artificial_pressure(V3::zeros(), vec3f(2. * h, 0., 0.)), 0.);
    }

    #[test]
    fn lambda_is_zero_for_underdense_particles() {
        let s = solver();

        let predicted = vec![V3::zeros(), vec3f(0.5, 0., 0.)];
        let mass = vec![15.625, 15.625];
        let neighbors = vec![1u32];

        let (density, lambda, _color) = s.compute_lambda(0, &predicted, &mass, &neighbors);
        assert!(density > 0.);
        assert!(density < 1000.);
        assert_eq!(lambda, 0.);
    }

    #[test]
    fn lambda_is_negative_for_compressed_particles() {
        let s = solver();

        // a dense clump far over rest density
        let mut predicted = Vec::new();
        for x in 0..5 {
            for y in 0..5 {
                for z in 0..5 {
                    predicted.push(vec3f(0.05 * x as FT, 0.05 * y as FT, 0.05 * z as FT));
                }
            }
        }
        let mass = vec![15.625; predicted.len()];
        let neighbors: Vec<u32> = (1..predicted.len() as u32).collect();

        let (density, lambda, _color) = s.compute_lambda(0, &predicted, &mass, &neighbors);
        assert!(density > 1000.);
        assert!(lambda < 0.);
    }

    #[test]
    fn wall_reflection_pushes_out_twice_the_penetration() {
        let s = solver();
        let bb = BoundingBox::new(-8., 6., -10., 10., -6.5, 2.);
        let radius = 0.125;

        let depth = 0.05;
        let mut predicted = vec3f(0., -10. + radius - depth, 0.);
        let mut velocity = vec3f(0., -2., 0.);
        s.collide(&bb, &mut predicted, &mut velocity, radius);

        assert_ft_approx_eq(predicted.y, -10. + radius + depth, 1e-5, || format!("predicted.y"));
        assert_ft_approx_eq(velocity.y, 1., 1e-6, || format!("velocity.y"));
    }

    #[test]
    fn interior_particles_are_left_alone_by_collision() {
        let s = solver();
        let bb = BoundingBox::new(-8., 6., -10., 10., -6.5, 2.);

        let mut predicted = vec3f(0., 0., 0.);
        let mut velocity = vec3f(1., 2., 3.);
        s.collide(&bb, &mut predicted, &mut velocity, 0.125);

        assert_eq!(predicted, vec3f(0., 0., 0.));
        assert_eq!(velocity, vec3f(1., 2., 3.));
    }

    #[test]
    fn corner_penetration_is_corrected_against_both_walls() {
        let s = solver();
        let bb = BoundingBox::new(-8., 6., -10., 10., -6.5, 2.);
        let radius = 0.125;

        let mut predicted = vec3f(-8.05, -10.05, 0.);
        let mut velocity = vec3f(-1., -1., 0.);
        s.collide(&bb, &mut predicted, &mut velocity, radius);

        assert!(predicted.x > -8. + radius);
        assert!(predicted.y > -10. + radius);
    }

    #[test]
    fn uniform_velocity_field_has_no_vorticity_or_viscosity() {
        let s = solver();

        let predicted = vec![V3::zeros(), vec3f(0.2, 0., 0.), vec3f(0., 0.2, 0.)];
        let velocity = vec![vec3f(1., 0., 0.); 3];
        let density = vec![500.; 3];
        let neighbors = vec![1u32, 2];

        let (smoothed, confinement) = s.vorticity_and_xsph(0, &predicted, &velocity, &density, &neighbors);
        assert_eq!(smoothed, vec3f(1., 0., 0.));
        assert_eq!(confinement, V3::zeros());
    }

    #[test]
    fn shearing_velocities_produce_a_confinement_force() {
        let s = solver();

        let predicted = vec![V3::zeros(), vec3f(0.2, 0.1, 0.), vec3f(-0.15, -0.2, 0.)];
        let velocity = vec![V3::zeros(), vec3f(0., 1., 0.), vec3f(0.5, -0.25, 0.)];
        let density = vec![500.; 3];
        let neighbors = vec![1u32, 2];

        let (_smoothed, confinement) = s.vorticity_and_xsph(0, &predicted, &velocity, &density, &neighbors);
        assert!(confinement.norm() > 0.);
    }
}
