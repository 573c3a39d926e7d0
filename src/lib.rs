pub mod config;
pub mod disk;

#[macro_use]
extern crate log;
