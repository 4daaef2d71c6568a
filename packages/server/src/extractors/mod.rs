pub mod client;
pub mod correlation;
pub mod json;
