// Domain layer: CRM records and the source port. No HTTP or file access here.

pub mod model;
pub mod ports;
