#[cfg(test)]
mod tests {
    use crate::numerical::RK::RK_api::{ExplicitRKODE, RKMethod};
    use crate::numerical::RK::RK_state::{OdeState, RKIntegrator};
    use crate::numerical::RK::RK_steppers::{BS5, Euler, RKStepper, Tsit5};
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    /// integrate y' = y, y(0) = 1 to t = 1 with a fixed step and return the
    /// absolute error against e
    fn fixed_step_error(method: RKMethod, dt: f64) -> f64 {
        let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = y[0];
        });
        let y0 = DVector::from_vec(vec![1.0]);
        let mut solver = ExplicitRKODE::new(method, f, 0.0, y0, 1.0, dt);
        solver.solve();
        assert_eq!(solver.status, "finished");
        let (_t, y) = solver.get_result();
        (y[(y.nrows() - 1, 0)] - 1.0f64.exp()).abs()
    }

    /// check that halving the step reproduces the design order on the ratios
    /// of global errors, ignoring halvings that sit in the roundoff floor
    fn check_order(method: RKMethod, dt0: f64, expected_order: f64) {
        let mut errors = Vec::new();
        let mut dt = dt0;
        for _ in 0..6 {
            errors.push(fixed_step_error(method, dt));
            dt /= 2.0;
        }
        let mut checked = 0;
        for pair in errors.windows(2) {
            if pair[0] < 1e-12 || pair[1] < 1e-12 {
                break;
            }
            let observed = (pair[0] / pair[1]).log2();
            assert!(
                (observed - expected_order).abs() <= 1.0,
                "{:?}: observed order {} for errors {:?}",
                method,
                observed,
                pair
            );
            checked += 1;
        }
        assert!(checked >= 2, "{:?}: not enough halvings above roundoff", method);
    }

    #[test]
    fn test_order_euler() {
        check_order(RKMethod::Euler, 0.02, 1.0);
    }

    #[test]
    fn test_order_midpoint() {
        check_order(RKMethod::Midpoint, 0.02, 2.0);
    }

    #[test]
    fn test_order_rk4() {
        check_order(RKMethod::RK4, 0.1, 4.0);
    }

    #[test]
    fn test_order_bs3() {
        check_order(RKMethod::BS3, 0.1, 3.0);
    }

    #[test]
    fn test_order_dp5() {
        check_order(RKMethod::DP5, 0.2, 5.0);
    }

    #[test]
    fn test_order_tsit5() {
        check_order(RKMethod::Tsit5, 0.2, 5.0);
    }

    #[test]
    fn test_order_bs5() {
        check_order(RKMethod::BS5, 0.2, 5.0);
    }

    #[test]
    fn test_tsit5_fixed_step_exponential() {
        // y' = y to t = 1 with dt = 0.1 lands on e well inside 1e-4
        let err = fixed_step_error(RKMethod::Tsit5, 0.1);
        assert!(err < 1e-4, "error {}", err);
    }

    #[test]
    fn test_euler_reproduces_accumulated_product() {
        // y' = -y with forward Euler is exactly the repeated update
        // y <- y + dt*(-y); the stepper must reproduce that product bitwise
        let f = Box::new(|_t: f64, u: &f64, du: &mut f64| {
            *du = -*u;
        });
        let mut igr: RKIntegrator<f64> = RKIntegrator::new(f, 0.0, 0.01, 1.0);
        let mut stepper = Euler::new();
        stepper.initialize(&mut igr);
        for _ in 0..100 {
            stepper.perform_step(&mut igr);
            igr.accept_step();
        }

        let mut reference = 1.0f64;
        for _ in 0..100 {
            let slope = -reference;
            reference = reference + slope * 0.01;
        }
        assert_eq!(igr.uprev.to_bits(), reference.to_bits());
        assert_relative_eq!(igr.uprev, 0.99f64.powi(100), epsilon = 1e-12);
        assert_relative_eq!(igr.uprev, 0.3660323, epsilon = 1e-7);
    }

    #[test]
    fn test_rk4_harmonic_oscillator_roundtrip() {
        // one full period of u'' = -u brings the state back to [1, 0]
        let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = y[1];
            dy[1] = -y[0];
        });
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let dt = std::f64::consts::PI / 100.0;
        let t_end = 2.0 * std::f64::consts::PI;
        let mut solver = ExplicitRKODE::new(RKMethod::RK4, f, 0.0, y0, t_end, dt);
        solver.solve();
        let (_t, y) = solver.get_result();
        let last = y.nrows() - 1;
        assert_relative_eq!(y[(last, 0)], 1.0, epsilon = 1e-7);
        assert!(y[(last, 1)].abs() < 1e-7);
    }

    #[test]
    fn test_fsal_identity_after_step() {
        // after a step fsallast must be exactly f(t + dt, u)
        let f_closure = |t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = -0.5 * y[0] + t.sin();
            dy[1] = y[0] - y[1] * t;
        };
        let f = Box::new(f_closure);
        let y0 = DVector::from_vec(vec![1.0, -0.3]);
        let mut igr: RKIntegrator<DVector<f64>> = RKIntegrator::new(f, 0.2, 0.05, y0.clone());
        let mut stepper: Tsit5<DVector<f64>> = Tsit5::new(&y0);
        stepper.initialize(&mut igr);
        stepper.perform_step(&mut igr);

        let mut expected = DVector::zeros(2);
        f_closure(igr.t + igr.dt, &igr.u, &mut expected);
        assert_eq!(igr.fsallast[0].to_bits(), expected[0].to_bits());
        assert_eq!(igr.fsallast[1].to_bits(), expected[1].to_bits());
    }

    #[test]
    fn test_fsalfirst_survives_rejected_step() {
        // a rejected step must leave fsalfirst = f(t, uprev) untouched so the
        // driver can simply retry with a smaller dt
        let f_closure = |_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = -50.0 * y[0];
        };
        let f = Box::new(f_closure);
        let y0 = DVector::from_vec(vec![1.0]);
        let mut igr: RKIntegrator<DVector<f64>> = RKIntegrator::new(f, 0.0, 1.0, y0.clone());
        igr.adaptive = true;
        igr.abstol = 1e-10;
        igr.reltol = 1e-10;
        let mut stepper: Tsit5<DVector<f64>> = Tsit5::new(&y0);
        stepper.initialize(&mut igr);
        let fsalfirst_before = igr.fsalfirst[0];
        stepper.perform_step(&mut igr);
        assert!(igr.EEst > 1.0, "the huge step must be rejected");
        // driver rejects: uprev and fsalfirst are untouched
        assert_eq!(igr.uprev[0].to_bits(), 1.0f64.to_bits());
        assert_eq!(igr.fsalfirst[0].to_bits(), fsalfirst_before.to_bits());
    }

    #[test]
    fn test_scalar_and_vector_shapes_agree_bitwise() {
        // the scalar instantiation and the length-1 vector instantiation run
        // the same arithmetic in the same order
        let fs = Box::new(|t: f64, u: &f64, du: &mut f64| {
            *du = -*u + t.cos();
        });
        let fv = Box::new(|t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = -y[0] + t.cos();
        });
        let mut igr_s: RKIntegrator<f64> = RKIntegrator::new(fs, 0.0, 0.05, 0.7);
        let y0 = DVector::from_vec(vec![0.7]);
        let mut igr_v: RKIntegrator<DVector<f64>> = RKIntegrator::new(fv, 0.0, 0.05, y0.clone());
        let mut st_s: Tsit5<f64> = Tsit5::new(&0.7);
        let mut st_v: Tsit5<DVector<f64>> = Tsit5::new(&y0);
        st_s.initialize(&mut igr_s);
        st_v.initialize(&mut igr_v);
        for _ in 0..20 {
            st_s.perform_step(&mut igr_s);
            st_v.perform_step(&mut igr_v);
            igr_s.accept_step();
            igr_v.accept_step();
            assert_eq!(igr_s.uprev.to_bits(), igr_v.uprev[0].to_bits());
        }
    }

    #[test]
    fn test_embedded_error_consistency() {
        // EEst must equal the norm of (utilde - u)/(abstol + max*reltol)
        let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = y[1];
            dy[1] = -2.0 * y[0] - 0.1 * y[1];
        });
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let mut igr: RKIntegrator<DVector<f64>> = RKIntegrator::new(f, 0.0, 0.2, y0.clone());
        igr.adaptive = true;
        let mut stepper: Tsit5<DVector<f64>> = Tsit5::new(&y0);
        stepper.initialize(&mut igr);
        stepper.perform_step(&mut igr);

        let mut atmp = DVector::zeros(2);
        atmp.diff_from(&stepper.utilde, &igr.u);
        atmp.scaled_residual(&igr.uprev, &igr.u, igr.abstol, igr.reltol);
        assert_relative_eq!(igr.EEst, atmp.rms_norm(), epsilon = 1e-14);
    }

    #[test]
    fn test_bs5_double_estimator_takes_maximum() {
        let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = y[1];
            dy[1] = -2.0 * y[0] - 0.1 * y[1];
        });
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let mut igr: RKIntegrator<DVector<f64>> = RKIntegrator::new(f, 0.0, 0.25, y0.clone());
        igr.adaptive = true;
        let mut stepper: BS5<DVector<f64>> = BS5::new(&y0);
        stepper.initialize(&mut igr);
        stepper.perform_step(&mut igr);

        let mut atmp = DVector::zeros(2);
        atmp.diff_from(&stepper.uhat, &igr.u);
        atmp.scaled_residual(&igr.uprev, &igr.u, igr.abstol, igr.reltol);
        let eest1 = atmp.rms_norm();
        atmp.diff_from(&stepper.utilde, &igr.u);
        atmp.scaled_residual(&igr.uprev, &igr.u, igr.abstol, igr.reltol);
        let eest2 = atmp.rms_norm();
        assert_relative_eq!(igr.EEst, eest1.max(eest2), epsilon = 1e-14);
        assert!(igr.EEst >= eest1 && igr.EEst >= eest2);
    }

    #[test]
    fn test_custom_internalnorm_is_used() {
        let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = y[0];
            dy[1] = -3.0 * y[1];
        });
        let y0 = DVector::from_vec(vec![1.0, 1.0]);
        let mut igr: RKIntegrator<DVector<f64>> = RKIntegrator::new(f, 0.0, 0.3, y0.clone());
        igr.adaptive = true;
        igr.internalnorm = Some(Box::new(|v: &DVector<f64>| v.amax()));
        let mut stepper: Tsit5<DVector<f64>> = Tsit5::new(&y0);
        stepper.initialize(&mut igr);
        stepper.perform_step(&mut igr);

        let mut atmp = DVector::zeros(2);
        atmp.diff_from(&stepper.utilde, &igr.u);
        atmp.scaled_residual(&igr.uprev, &igr.u, igr.abstol, igr.reltol);
        assert_relative_eq!(igr.EEst, atmp.amax(), epsilon = 1e-14);
    }

    #[test]
    fn test_calck_populates_dense_slopes() {
        let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = -y[0];
        });
        let y0 = DVector::from_vec(vec![1.0]);
        let mut igr: RKIntegrator<DVector<f64>> = RKIntegrator::new(f, 0.0, 0.1, y0.clone());
        igr.calck = true;
        let mut stepper: Tsit5<DVector<f64>> = Tsit5::new(&y0);
        stepper.initialize(&mut igr);
        assert_eq!(igr.k.len(), 7);
        stepper.perform_step(&mut igr);
        // first and last retained slopes are the FSAL pair
        assert_eq!(igr.k[0][0].to_bits(), igr.fsalfirst[0].to_bits());
        assert_eq!(igr.k[6][0].to_bits(), igr.fsallast[0].to_bits());
    }

    #[test]
    fn test_dp5_dense_slopes_structure() {
        use crate::numerical::RK::RK_steppers::DP5;
        let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = -y[0];
        });
        let y0 = DVector::from_vec(vec![1.0]);
        let mut igr: RKIntegrator<DVector<f64>> = RKIntegrator::new(f, 0.0, 0.1, y0.clone());
        igr.calck = true;
        let mut stepper: DP5<DVector<f64>> = DP5::new(&y0);
        stepper.initialize(&mut igr);
        assert_eq!(igr.k.len(), 4);
        stepper.perform_step(&mut igr);
        // k[1] = k1 - update and k[2] = update - k7 - bspl by construction
        let update = igr.k[0][0];
        let bspl = igr.k[1][0];
        assert_relative_eq!(bspl, igr.fsalfirst[0] - update, epsilon = 1e-15);
        assert_relative_eq!(
            igr.k[2][0],
            update - igr.fsallast[0] - bspl,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_adaptive_integration_reaches_tolerance() {
        for method in [RKMethod::BS3, RKMethod::DP5, RKMethod::Tsit5, RKMethod::BS5] {
            let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
                dy[0] = -y[0];
            });
            let y0 = DVector::from_vec(vec![1.0]);
            let mut solver = ExplicitRKODE::new(method, f, 0.0, y0, 5.0, 0.1);
            solver.set_adaptive(true);
            solver.set_tolerances(1e-8, 1e-8);
            solver.solve();
            assert_eq!(solver.status, "finished", "{:?}", method);
            assert!(solver.naccept > 0);
            let (_t, y) = solver.get_result();
            let final_y = y[(y.nrows() - 1, 0)];
            let exact = (-5.0f64).exp();
            assert!(
                (final_y - exact).abs() < 1e-6,
                "{:?}: final {} vs {}",
                method,
                final_y,
                exact
            );
        }
    }

    #[test]
    fn test_adaptive_rejects_oversized_initial_step() {
        let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = -40.0 * y[0];
        });
        let y0 = DVector::from_vec(vec![1.0]);
        let mut solver = ExplicitRKODE::new(RKMethod::DP5, f, 0.0, y0, 1.0, 0.9);
        solver.set_adaptive(true);
        solver.set_tolerances(1e-8, 1e-8);
        solver.solve();
        assert_eq!(solver.status, "finished");
        assert!(solver.nreject > 0, "the first trial step must be rejected");
        let (_t, y) = solver.get_result();
        let final_y = y[(y.nrows() - 1, 0)];
        assert_relative_eq!(final_y, (-40.0f64).exp(), epsilon = 1e-6);
    }

    #[test]
    fn test_linear_system_2x2() {
        // y1' = -2*y1 + y2, y2' = y1 - 2*y2 with known exact solution
        let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = -2.0 * y[0] + y[1];
            dy[1] = y[0] - 2.0 * y[1];
        });
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let mut solver = ExplicitRKODE::new(RKMethod::Tsit5, f, 0.0, y0, 1.0, 0.05);
        solver.set_adaptive(true);
        solver.set_tolerances(1e-10, 1e-10);
        solver.solve();
        let (_t, y) = solver.get_result();
        let last = y.nrows() - 1;
        let y1_exact = 0.5 * f64::exp(-3.0) * (f64::exp(2.0) + 1.0);
        let y2_exact = 0.5 * f64::exp(-3.0) * (f64::exp(2.0) - 1.0);
        assert_relative_eq!(y[(last, 0)], y1_exact, epsilon = 1e-7);
        assert_relative_eq!(y[(last, 1)], y2_exact, epsilon = 1e-7);
    }

    #[test]
    fn test_save_result_writes_trajectory_csv() {
        use crate::numerical::RK::RK_api::init_solver_logging;
        use simplelog::LevelFilter;

        let logfile = std::env::temp_dir().join("rustedode_solver.log");
        // first and only init in this process; the file sink captures the
        // accept/reject trace at Debug
        init_solver_logging(LevelFilter::Warn, logfile.to_str()).unwrap();

        let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
            dy[0] = y[1];
            dy[1] = -y[0];
        });
        let y0 = DVector::from_vec(vec![1.0, 0.0]);
        let mut solver = ExplicitRKODE::new(RKMethod::RK4, f, 0.0, y0, 0.5, 0.1);
        solver.solve();

        let csvfile = std::env::temp_dir().join("rustedode_trajectory.csv");
        solver.save_result(csvfile.to_str().unwrap()).unwrap();
        let contents = std::fs::read_to_string(&csvfile).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), "t,y1,y2");
        // header plus one row per stored point (initial condition + 5 steps)
        assert_eq!(contents.lines().count(), solver.t_result.len() + 1);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(RKMethod::from_name("Tsit5").unwrap(), RKMethod::Tsit5);
        assert_eq!(RKMethod::from_name("DOPRI").unwrap(), RKMethod::DP5);
        assert!(RKMethod::from_name("Rosenbrock").is_err());
        assert!(RKMethod::Euler.has_embedded() == false);
        assert!(RKMethod::BS5.has_embedded());
    }
}
