pub mod ports;
pub mod event_bus;
pub mod tools;
pub mod store;
pub mod router;
pub mod guards;
pub mod executor;
pub mod gate;
pub mod shaper;
pub mod summary;
