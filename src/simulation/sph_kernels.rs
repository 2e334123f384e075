use crate::{
    floating_type_mod::{FT, PI},
    V3,
};

/**
 * Poly6 smoothing kernel, used for density estimation:
 *
 *   W(r) = 315 / (64 pi h^9) * (h^2 - r^2)^3   for 0 <= r <= h
 *
 * The normalization constant is precomputed once for the given support
 * radius h.
 */
#[derive(Debug, Clone, Copy)]
pub struct Poly6Kernel {
    h: FT,
    norm_factor: FT,
}

impl Poly6Kernel {
    pub fn new(smoothing_length: FT) -> Poly6Kernel {
        let h = smoothing_length;
        Poly6Kernel {
            h,
            norm_factor: 315. / (64. * PI * h.powi(9)),
        }
    }

    pub fn weight(&self, r: FT) -> FT {
        if r < 0. || r > self.h {
            return 0.;
        }
        let tmp = self.h * self.h - r * r;
        self.norm_factor * tmp * tmp * tmp
    }
}

/**
 * Gradient of the Spiky kernel, used wherever a non-vanishing gradient at
 * small distances is needed (the Poly6 gradient goes to zero at the
 * origin):
 *
 *   grad W(x) = -45 / (pi h^6) * (h - r)^2 * x/r   for 0 < r <= h
 *
 * Zero at r = 0 and beyond the support radius.
 */
#[derive(Debug, Clone, Copy)]
pub struct SpikyKernel {
    h: FT,
    norm_factor: FT,
}

impl SpikyKernel {
    pub fn new(smoothing_length: FT) -> SpikyKernel {
        let h = smoothing_length;
        SpikyKernel {
            h,
            norm_factor: -45. / (PI * h.powi(6)),
        }
    }

    pub fn gradient(&self, mut diff: V3) -> V3 {
        let r = diff.norm();
        if r <= 1.0e-5 || r > self.h {
            return V3::zeros();
        }
        diff.unscale_mut(r);

        let tmp = self.h - r;
        self.norm_factor * tmp * tmp * diff
    }
}

#[test]
fn poly6_kernel_integration_test() {
    use crate::vec3f;

    let h: FT = 0.625;
    let kernel = Poly6Kernel::new(h);

    let grid_size = 100;
    let cube_len = 2. * h / grid_size as FT;
    let cube_volume = cube_len * cube_len * cube_len;

    // sum in f64; a million f32 additions lose too many digits
    let mut integral: f64 = 0.;

    for z in 0..grid_size {
        for y in 0..grid_size {
            for x in 0..grid_size {
                let integration_point = vec3f(
                    (x as FT + 0.5) * cube_len - h,
                    (y as FT + 0.5) * cube_len - h,
                    (z as FT + 0.5) * cube_len - h,
                );
                integral += (kernel.weight(integration_point.norm()) * cube_volume) as f64;
            }
        }
    }

    println!("Integration of Poly6 kernel with h={:.3}: {}", h, integral);
    assert!((integral - 1.).abs() < 0.01);
}

#[test]
fn poly6_kernel_support_test() {
    let h: FT = 0.625;
    let kernel = Poly6Kernel::new(h);

    assert!(kernel.weight(0.) > 0.);
    assert!(kernel.weight(0.99 * h) > 0.);
    assert_eq!(kernel.weight(1.01 * h), 0.);
    assert_eq!(kernel.weight(10. * h), 0.);

    // monotonically decreasing on the support
    assert!(kernel.weight(0.) > kernel.weight(0.3 * h));
    assert!(kernel.weight(0.3 * h) > kernel.weight(0.9 * h));
}

#[test]
fn spiky_gradient_matches_finite_differences() {
    use crate::vec3f;

    let h: FT = 0.625;
    let kernel = SpikyKernel::new(h);

    // scalar spiky kernel whose analytic gradient the implementation returns
    let spiky_weight = |p: V3| -> FT {
        let r = p.norm();
        if r > h {
            return 0.;
        }
        let tmp = h - r;
        15. / (PI * h.powi(6)) * tmp * tmp * tmp
    };

    let test_grid_size = 20;
    let probe_offset = 2. * h / test_grid_size as FT;
    let diff = h * 1e-3;
    let diff_half = diff * 0.5;

    for z in 0..=test_grid_size {
        for y in 0..=test_grid_size {
            for x in 0..=test_grid_size {
                let probe_point = vec3f(
                    (x as FT + 0.5) * probe_offset - h,
                    (y as FT + 0.5) * probe_offset - h,
                    (z as FT + 0.5) * probe_offset - h,
                );

                // the gradient is discontinuous at the origin and clipped
                // at the support boundary
                let r = probe_point.norm();
                if r < 0.15 * h || r > 0.9 * h {
                    continue;
                }

                let analytical_deriv = kernel.gradient(probe_point);

                let approx_deriv = vec3f(
                    (spiky_weight(probe_point + vec3f(diff_half, 0., 0.))
                        - spiky_weight(probe_point + vec3f(-diff_half, 0., 0.)))
                        / diff,
                    (spiky_weight(probe_point + vec3f(0., diff_half, 0.))
                        - spiky_weight(probe_point + vec3f(0., -diff_half, 0.)))
                        / diff,
                    (spiky_weight(probe_point + vec3f(0., 0., diff_half))
                        - spiky_weight(probe_point + vec3f(0., 0., -diff_half)))
                        / diff,
                );

                let absolute_error = analytical_deriv - approx_deriv;
                assert!(
                    absolute_error.norm() < 0.05,
                    "gradient mismatch at {:?}: analytical={:?} approx={:?}",
                    probe_point,
                    analytical_deriv,
                    approx_deriv
                );
            }
        }
    }
}

#[test]
fn spiky_gradient_zero_cases() {
    let h: FT = 0.625;
    let kernel = SpikyKernel::new(h);

    assert_eq!(kernel.gradient(V3::zeros()), V3::zeros());
    assert_eq!(kernel.gradient(crate::vec3f(2. * h, 0., 0.)), V3::zeros());

    // points from the further particle towards the probe: the gradient of
    // a decreasing radial function is anti-parallel to the offset
    let g = kernel.gradient(crate::vec3f(0.5 * h, 0., 0.));
    assert!(g.x < 0.);
    assert_eq!(g.y, 0.);
    assert_eq!(g.z, 0.);
}
