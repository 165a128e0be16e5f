pub mod long_range;
pub mod params;
pub mod potentials;
pub mod softcore;
pub mod switch;
pub mod type_table;
