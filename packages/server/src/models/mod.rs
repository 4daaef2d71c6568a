pub mod admin;
pub mod ingest;
pub mod media;
pub mod shared;
