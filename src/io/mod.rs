pub mod dummy;
pub mod gateway;
pub mod store;
