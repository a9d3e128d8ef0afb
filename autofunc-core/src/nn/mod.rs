// src/nn/mod.rs
// Layers built on the custom functions.

pub mod layers;
pub mod module;
pub mod parameter;

pub use layers::linear::Linear;
pub use module::Module;
pub use parameter::Parameter;
