use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProductRequest::ProductRequests)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductRequest::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductRequest::UserId).integer().not_null())
                    .col(
                        ColumnDef::new(ProductRequest::ProductId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductRequest::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProductRequest::Notes).text())
                    .col(
                        ColumnDef::new(ProductRequest::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ProductRequest::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductRequest::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_request_user")
                            .from(ProductRequest::ProductRequests, ProductRequest::UserId)
                            .to(User::Users, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_request_product")
                            .from(
                                ProductRequest::ProductRequests,
                                ProductRequest::ProductId,
                            )
                            .to(Product::Products, Product::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ProductRequest::ProductRequests)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum ProductRequest {
    ProductRequests,
    Id,
    UserId,
    ProductId,
    Quantity,
    Notes,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User {
    Users,
    Id,
}

#[derive(DeriveIden)]
enum Product {
    Products,
    Id,
}
