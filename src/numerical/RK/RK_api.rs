//! High level API for the explicit Runge-Kutta solvers.
//!
//! `ExplicitRKODE` owns an integrator handle and a stepper instance, runs the
//! accept/reject main loop and collects the trajectory. Step-size control is
//! the standard error-based factor `0.9 * EEst^(-1/order)` clamped to
//! `[0.2, 10]`, never growing right after a rejection.
use crate::Utils::logger::save_trajectory_csv;
use crate::numerical::RK::RK_state::RKIntegrator;
use crate::numerical::RK::RK_steppers::{BS3, BS5, DP5, Euler, Midpoint, RK4, RKStepper, Tsit5};
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::error::Error;
use std::fs::File;
use std::time::Instant;

/// One-shot logger setup for solver runs.
///
/// The main loop emits `info!` on start/finish, `debug!` for every rejected
/// step and `warn!` on failure; the console shows them from `level` up, and
/// `logfile`, when given, captures the full accept/reject trace at `Debug`
/// regardless of the console level. Call once per process; a second call
/// reports the underlying `set_logger` error.
pub fn init_solver_logging(level: LevelFilter, logfile: Option<&str>) -> Result<(), Box<dyn Error>> {
    let mut sinks: Vec<Box<dyn SharedLogger>> = Vec::new();
    sinks.push(TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    if let Some(path) = logfile {
        sinks.push(WriteLogger::new(
            LevelFilter::Debug,
            Config::default(),
            File::create(path)?,
        ));
    }
    CombinedLogger::init(sinks)?;
    Ok(())
}

/// smallest step the controller is allowed to propose
const MIN_STEP: f64 = 1e-14;
/// step-size controller constants
const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;

pub type RHS = Box<dyn Fn(f64, &DVector<f64>, &mut DVector<f64>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RKMethod {
    Euler,
    Midpoint,
    RK4,
    BS3,
    DP5,
    Tsit5,
    BS5,
}

impl RKMethod {
    pub fn from_name(name: &str) -> Result<RKMethod, Box<dyn Error>> {
        match name {
            "Euler" => Ok(RKMethod::Euler),
            "Midpoint" => Ok(RKMethod::Midpoint),
            "RK4" => Ok(RKMethod::RK4),
            "BS3" => Ok(RKMethod::BS3),
            "DP5" | "DOPRI" => Ok(RKMethod::DP5),
            "Tsit5" => Ok(RKMethod::Tsit5),
            "BS5" => Ok(RKMethod::BS5),
            _ => Err(format!("Unknown method name: {}", name).into()),
        }
    }

    /// whether the method carries an embedded error estimator
    pub fn has_embedded(&self) -> bool {
        matches!(
            self,
            RKMethod::BS3 | RKMethod::DP5 | RKMethod::Tsit5 | RKMethod::BS5
        )
    }
}

pub enum Steppers {
    Euler(Euler),
    Midpoint(Midpoint<DVector<f64>>),
    RK4(RK4<DVector<f64>>),
    BS3(BS3<DVector<f64>>),
    DP5(DP5<DVector<f64>>),
    Tsit5(Tsit5<DVector<f64>>),
    BS5(BS5<DVector<f64>>),
}

impl Steppers {
    pub fn new(method: RKMethod, y0: &DVector<f64>) -> Steppers {
        match method {
            RKMethod::Euler => Steppers::Euler(Euler::new()),
            RKMethod::Midpoint => Steppers::Midpoint(Midpoint::new(y0)),
            RKMethod::RK4 => Steppers::RK4(RK4::new(y0)),
            RKMethod::BS3 => Steppers::BS3(BS3::new(y0)),
            RKMethod::DP5 => Steppers::DP5(DP5::new(y0)),
            RKMethod::Tsit5 => Steppers::Tsit5(Tsit5::new(y0)),
            RKMethod::BS5 => Steppers::BS5(BS5::new(y0)),
        }
    }

    fn as_stepper(&mut self) -> &mut dyn RKStepper<DVector<f64>> {
        match self {
            Steppers::Euler(s) => s,
            Steppers::Midpoint(s) => s,
            Steppers::RK4(s) => s,
            Steppers::BS3(s) => s,
            Steppers::DP5(s) => s,
            Steppers::Tsit5(s) => s,
            Steppers::BS5(s) => s,
        }
    }
}

pub struct ExplicitRKODE {
    pub method: RKMethod,
    pub integrator: RKIntegrator<DVector<f64>>,
    stepper: Steppers,
    t0: f64,
    pub t_bound: f64,
    pub max_steps: usize,
    pub status: String,
    pub message: Option<String>,
    pub t_result: DVector<f64>,
    pub y_result: DMatrix<f64>,
    pub naccept: usize,
    pub nreject: usize,
}

impl ExplicitRKODE {
    pub fn new(
        method: RKMethod,
        f: RHS,
        t0: f64,
        y0: DVector<f64>,
        t_bound: f64,
        h_step: f64,
    ) -> Self {
        assert!(h_step > 0.0, "`h_step` must be positive");
        assert!(t_bound > t0, "`t_bound` must lie beyond `t0`");
        let stepper = Steppers::new(method, &y0);
        let integrator = RKIntegrator::new(f, t0, h_step, y0);
        ExplicitRKODE {
            method,
            integrator,
            stepper,
            t0,
            t_bound,
            max_steps: 1_000_000,
            status: "running".to_string(),
            message: None,
            t_result: DVector::zeros(1),
            y_result: DMatrix::zeros(1, 1),
            naccept: 0,
            nreject: 0,
        }
    }

    pub fn set_tolerances(&mut self, abstol: f64, reltol: f64) {
        self.integrator.abstol = abstol;
        self.integrator.reltol = reltol;
    }

    pub fn set_adaptive(&mut self, adaptive: bool) {
        if adaptive && !self.method.has_embedded() {
            warn!(
                "method {:?} has no embedded estimator, running fixed-step",
                self.method
            );
            self.integrator.adaptive = false;
            return;
        }
        self.integrator.adaptive = adaptive;
    }

    pub fn solve(&mut self) {
        self.main_loop();
    }

    fn main_loop(&mut self) {
        let start = Instant::now();
        info!(
            "starting {:?} main loop, t in [{}, {}]",
            self.method, self.t0, self.t_bound
        );
        let order = self.stepper.as_stepper().order() as f64;
        let igr = &mut self.integrator;
        self.stepper.as_stepper().initialize(igr);

        let mut t_hist: Vec<f64> = vec![igr.t];
        let mut y_hist: Vec<DVector<f64>> = vec![igr.uprev.clone()];
        let mut steps: usize = 0;

        while self.status == "running" {
            // clamp the final step onto t_bound
            let mut last = false;
            if igr.dt >= self.t_bound - igr.t {
                igr.dt = self.t_bound - igr.t;
                last = true;
            }

            self.stepper.as_stepper().perform_step(igr);
            steps += 1;

            let accept = !igr.adaptive || igr.EEst <= 1.0;
            if accept {
                igr.accept_step();
                self.naccept += 1;
                t_hist.push(igr.t);
                y_hist.push(igr.uprev.clone());
                if last {
                    self.status = "finished".to_string();
                }
            } else {
                self.nreject += 1;
                debug!(
                    "step rejected at t = {:.6}, EEst = {:.3e}, dt = {:.3e}",
                    igr.t, igr.EEst, igr.dt
                );
            }

            if igr.adaptive && self.status == "running" {
                let factor = if !igr.EEst.is_finite() {
                    // a non-finite estimate means f blew up; retreat hard
                    MIN_FACTOR
                } else if igr.EEst == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * igr.EEst.powf(-1.0 / order)).clamp(MIN_FACTOR, MAX_FACTOR)
                };
                // never grow the step right after a rejection
                let factor = if accept { factor } else { factor.min(1.0) };
                igr.dt *= factor;
                if igr.dt < MIN_STEP {
                    self.status = "failed".to_string();
                    self.message = Some(format!(
                        "step size {:.3e} below minimum at t = {:.6}",
                        igr.dt, igr.t
                    ));
                }
            }

            if steps >= self.max_steps && self.status == "running" {
                self.status = "failed".to_string();
                self.message = Some(format!(
                    "maximum step count {} exceeded at t = {:.6}",
                    self.max_steps, igr.t
                ));
            }
        }

        // pack the trajectory into (t_result, y_result)
        let rows = y_hist.len();
        let cols = y_hist[0].len();
        let mut flat: Vec<f64> = Vec::with_capacity(rows * cols);
        for y in y_hist.iter() {
            flat.extend(y.iter());
        }
        self.y_result = DMatrix::from_vec(cols, rows, flat).transpose();
        self.t_result = DVector::from_vec(t_hist);

        let duration = start.elapsed();
        info!(
            "{:?} {} after {} accepted / {} rejected steps in {} ms",
            self.method,
            self.status,
            self.naccept,
            self.nreject,
            duration.as_millis()
        );
        if self.status == "failed" {
            if let Some(ref msg) = self.message {
                warn!("integration failed: {}", msg);
            }
        }
    }

    pub fn get_result(&self) -> (DVector<f64>, DMatrix<f64>) {
        (self.t_result.clone(), self.y_result.clone())
    }

    /// export the collected trajectory as CSV, columns labelled `t, y1, ...`
    pub fn save_result(&self, filename: &str) -> Result<(), Box<dyn Error>> {
        save_trajectory_csv(filename, "t", &[], &self.t_result, &self.y_result)?;
        info!("result saved to {}", filename);
        Ok(())
    }
}
