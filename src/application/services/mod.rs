pub mod agent;
pub mod registry;
pub mod snapshot_builder;
