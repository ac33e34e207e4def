//! Model invocation: adapter ports, response normalization, and the
//! health-tracking model registry.

pub mod adapter;
pub mod box_adapter;
pub mod health;
pub mod normalize;
pub mod registry;
