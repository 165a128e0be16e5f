pub mod crystal;
pub mod forcefield;
pub mod io;
pub mod models;
