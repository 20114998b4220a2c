// Domain layer: task reports, notifications and the ports the pipeline talks through.

pub mod model;
pub mod ports;
