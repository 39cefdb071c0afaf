use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductCategory::ProductCategories)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductCategory::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProductCategory::ProductId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductCategory::CategoryId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductCategory::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_category_product")
                            .from(
                                ProductCategory::ProductCategories,
                                ProductCategory::ProductId,
                            )
                            .to(Product::Products, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_category_category")
                            .from(
                                ProductCategory::ProductCategories,
                                ProductCategory::CategoryId,
                            )
                            .to(Category::Categories, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per (product, category) pair
        manager
            .create_index(
                Index::create()
                    .name("idx_product_categories_pair")
                    .table(ProductCategory::ProductCategories)
                    .col(ProductCategory::ProductId)
                    .col(ProductCategory::CategoryId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ProductCategory::ProductCategories)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum ProductCategory {
    ProductCategories,
    Id,
    ProductId,
    CategoryId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Product {
    Products,
    Id,
}

#[derive(DeriveIden)]
enum Category {
    Categories,
    Id,
}
