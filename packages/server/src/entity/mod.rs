pub mod api_key;
pub mod audit_log;
pub mod blog_post;
pub mod media_asset;
pub mod portfolio_item;
