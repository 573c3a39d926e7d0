pub mod build;
pub mod emit;
pub mod query;
pub mod resolve;
pub mod show;
