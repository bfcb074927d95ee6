pub mod alerting;
pub mod diff;
pub mod entities;
pub mod ports;
pub mod value_objects;
