pub mod customers;
pub mod devices;
pub mod errors;
