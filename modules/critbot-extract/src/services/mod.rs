// Per-site extraction routines over rendered DOM, plus the static fetch path.

pub mod page;
pub mod reddit;
pub mod twitter;
