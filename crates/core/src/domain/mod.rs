pub mod address;
pub mod plan;
pub mod registration;
