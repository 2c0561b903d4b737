// Domain layer: value types and collaborator ports.

pub mod model;
pub mod ports;
