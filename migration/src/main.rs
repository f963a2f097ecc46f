//! Standalone runner for the listings schema, e.g.
//! `DATABASE_URL=sqlite://cartelera.db?mode=rwc cargo run -p migration -- status`.
//! The service applies pending migrations itself on startup.

use sea_orm_migration::prelude::*;

#[async_std::main]
async fn main() {
    cli::run_cli(migration::Migrator).await;
}
