pub mod config;
pub mod display;
pub mod pose;
pub mod render;
pub mod sensor;
pub mod tracker;
pub mod transmit;
