// Path Planning algorithms module

pub mod state_lattice;

pub use state_lattice::*;
