// Domain layer: value types and the process-runner port. No I/O here.

pub mod model;
pub mod ports;
