pub use sea_orm_migration::prelude::*;

mod m20250310_000001_create_users_table;
mod m20250310_000002_create_refresh_tokens_table;
mod m20250311_000003_create_categories_table;
mod m20250311_000004_create_products_table;
mod m20250311_000005_create_product_categories_table;
mod m20250312_000006_create_product_requests_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250310_000001_create_users_table::Migration),
            Box::new(m20250310_000002_create_refresh_tokens_table::Migration),
            Box::new(m20250311_000003_create_categories_table::Migration),
            Box::new(m20250311_000004_create_products_table::Migration),
            Box::new(m20250311_000005_create_product_categories_table::Migration),
            Box::new(m20250312_000006_create_product_requests_table::Migration),
        ]
    }
}
