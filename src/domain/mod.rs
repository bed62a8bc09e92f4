pub mod builder;
pub mod cluster;
pub mod graph;
pub mod language;
pub mod location;
pub mod lookup;
pub mod reconcile;
pub mod symbol;
