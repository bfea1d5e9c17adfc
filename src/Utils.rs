/// tiny module to export integration trajectories
pub mod logger;
