#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// Butcher tableau records for the embedded adaptive methods
pub mod RK_tableaus;
/// the state algebra: scalar and vector state carriers plus the integrator handle
pub mod RK_state;
/// the stepper family: one-step advancing for every method
pub mod RK_steppers;
/// high level API: method selection, main loop, step size control, result export
pub mod RK_api;

mod RK_test;
