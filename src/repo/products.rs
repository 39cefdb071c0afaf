use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, LoaderTrait, ModelTrait,
    PaginatorTrait, QueryFilter, Set,
};

use crate::entities::{category, product, product_category};
use crate::error::AppError;
use crate::pagination::PageMeta;
use crate::query::{self, ProductQuery};

/// One page of active products matching the composed filters, each with
/// its active categories eager-loaded.
pub async fn list_active_filtered(
    db: &DatabaseConnection,
    query: &ProductQuery,
) -> Result<(Vec<(product::Model, Vec<category::Model>)>, PageMeta), AppError> {
    let paginator = query::compose(query).paginate(db, query.per_page);
    let total = paginator.num_items().await?;
    let products = paginator.fetch_page(query.page - 1).await?;

    let categories = products
        .load_many_to_many(
            category::Entity::find().filter(category::Column::IsActive.eq(true)),
            product_category::Entity,
            db,
        )
        .await?;

    let meta = PageMeta::new(query.page, query.per_page, total, products.len() as u64);
    Ok((products.into_iter().zip(categories).collect(), meta))
}

pub async fn find_active_with_categories(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<(product::Model, Vec<category::Model>)>, AppError> {
    let Some(found) = product::Entity::find_by_id(id)
        .filter(product::Column::IsActive.eq(true))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let categories = found
        .find_related(category::Entity)
        .filter(category::Column::IsActive.eq(true))
        .all(db)
        .await?;

    Ok(Some((found, categories)))
}

/// Replace the product's association set with exactly the given
/// category ids: insert the missing pairs, delete the extra ones.
/// Running it twice with the same input is a no-op the second time.
pub async fn sync_categories<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    category_ids: &[i32],
) -> Result<(), AppError> {
    let existing: Vec<i32> = product_category::Entity::find()
        .filter(product_category::Column::ProductId.eq(product_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|row| row.category_id)
        .collect();

    let to_remove: Vec<i32> = existing
        .iter()
        .copied()
        .filter(|id| !category_ids.contains(id))
        .collect();
    if !to_remove.is_empty() {
        product_category::Entity::delete_many()
            .filter(product_category::Column::ProductId.eq(product_id))
            .filter(product_category::Column::CategoryId.is_in(to_remove))
            .exec(conn)
            .await?;
    }

    let now = chrono::Utc::now().naive_utc();
    let to_add: Vec<product_category::ActiveModel> = category_ids
        .iter()
        .copied()
        .filter(|id| !existing.contains(id))
        .map(|category_id| product_category::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(category_id),
            created_at: Set(now),
            ..Default::default()
        })
        .collect();
    if !to_add.is_empty() {
        product_category::Entity::insert_many(to_add).exec(conn).await?;
    }

    Ok(())
}

/// Association rows must never outlive the product on hard delete.
pub async fn detach_all<C: ConnectionTrait>(conn: &C, product_id: i32) -> Result<(), AppError> {
    product_category::Entity::delete_many()
        .filter(product_category::Column::ProductId.eq(product_id))
        .exec(conn)
        .await?;
    Ok(())
}
