use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::entity::{audit_log, media_asset, portfolio_item};

/// Ensure secondary indexes exist.
///
/// SeaORM's schema-sync doesn't create non-unique or composite indexes,
/// so we create them manually on startup. Failures are logged, not fatal.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Cascading deletes look media up by owner.
    create_index(
        db,
        "idx_media_assets_portfolio_item",
        Index::create()
            .if_not_exists()
            .name("idx_media_assets_portfolio_item")
            .table(media_asset::Entity)
            .col(media_asset::Column::PortfolioItemId)
            .to_owned(),
    )
    .await;

    create_index(
        db,
        "idx_media_assets_blog_post",
        Index::create()
            .if_not_exists()
            .name("idx_media_assets_blog_post")
            .table(media_asset::Entity)
            .col(media_asset::Column::BlogPostId)
            .to_owned(),
    )
    .await;

    // Public listing: WHERE status = ? ORDER BY order_rank
    create_index(
        db,
        "idx_portfolio_items_status_rank",
        Index::create()
            .if_not_exists()
            .name("idx_portfolio_items_status_rank")
            .table(portfolio_item::Entity)
            .col(portfolio_item::Column::Status)
            .col(portfolio_item::Column::OrderRank)
            .to_owned(),
    )
    .await;

    // Tracing a request: WHERE correlation_id = ?
    create_index(
        db,
        "idx_audit_logs_correlation",
        Index::create()
            .if_not_exists()
            .name("idx_audit_logs_correlation")
            .table(audit_log::Entity)
            .col(audit_log::Column::CorrelationId)
            .to_owned(),
    )
    .await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: IndexCreateStatement) {
    let sql = stmt.to_string(PostgresQueryBuilder);
    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}
