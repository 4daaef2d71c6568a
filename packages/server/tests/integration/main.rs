mod admin;
mod ingest_portfolio;
mod media;
