#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// Explicit Runge-Kutta solvers for non-stiff initial value problems
///
///  u'(t) = f(t, u),   u(t0) = u0,   t in [t0, t_bound]
///
///  Example#1
/// ```
///  // solve y' = -y, y(0) = 1 with the adaptive Tsitouras 5(4) method
///  use RustedODE::numerical::RK::RK_api::{ExplicitRKODE, RKMethod};
///  use nalgebra::DVector;
///  let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
///      dy[0] = -y[0];
///  });
///  let y0 = DVector::from_vec(vec![1.0]);
///  let mut solver = ExplicitRKODE::new(RKMethod::Tsit5, f, 0.0, y0, 1.0, 0.1);
///  solver.set_adaptive(true);
///  solver.set_tolerances(1e-8, 1e-8);
///  solver.solve();
///  let (_t_result, y_result) = solver.get_result();
///  let final_y = y_result[(y_result.nrows() - 1, 0)];
///  assert!((final_y - (-1.0f64).exp()).abs() < 1e-4);
/// ```
/// Example#2
/// ```
///  // fixed-step classical RK4 on the harmonic oscillator
///  use RustedODE::numerical::RK::RK_api::{ExplicitRKODE, RKMethod};
///  use nalgebra::DVector;
///  let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
///      dy[0] = y[1];
///      dy[1] = -y[0];
///  });
///  let y0 = DVector::from_vec(vec![1.0, 0.0]);
///  let mut solver = ExplicitRKODE::new(RKMethod::RK4, f, 0.0, y0, 1.0, 0.01);
///  solver.solve();
///  let (_t, y) = solver.get_result();
///  let final_y1 = y[(y.nrows() - 1, 0)];
///  assert!((final_y1 - 1.0f64.cos()).abs() < 1e-8);
/// ```
pub mod RK;
