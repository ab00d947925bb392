pub mod config;
pub mod energy;
pub mod grid;
pub mod process;
pub mod reference;
pub mod schema;
pub mod sink;
