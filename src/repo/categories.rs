use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, LoaderTrait,
    QueryFilter, QueryOrder, Set,
};
use std::collections::BTreeMap;

use crate::entities::{category, product, product_category};
use crate::error::AppError;

/// Resolve requested category names to active categories only.
/// Matching is case-insensitive on the trimmed name. If any name does
/// not resolve, the whole operation fails with a 422 listing every
/// invalid name.
pub async fn resolve_active_by_names<C: ConnectionTrait>(
    conn: &C,
    names: &[String],
) -> Result<Vec<category::Model>, AppError> {
    let normalized: Vec<String> = {
        let mut seen = Vec::new();
        for name in names {
            let key = name.trim().to_lowercase();
            if !key.is_empty() && !seen.contains(&key) {
                seen.push(key);
            }
        }
        seen
    };

    if normalized.is_empty() {
        return Ok(Vec::new());
    }

    let found = category::Entity::find()
        .filter(category::Column::IsActive.eq(true))
        .filter(
            Expr::expr(Func::lower(Expr::col(category::Column::Name)))
                .is_in(normalized.iter().map(String::as_str)),
        )
        .all(conn)
        .await?;

    let mut invalid = Vec::new();
    let mut resolved = Vec::new();
    for key in &normalized {
        match found.iter().find(|c| &c.name.to_lowercase() == key) {
            Some(category) => resolved.push(category.clone()),
            None => invalid.push(key.clone()),
        }
    }

    if !invalid.is_empty() {
        let mut errors = BTreeMap::new();
        errors.insert(
            "categories".to_string(),
            invalid
                .into_iter()
                .map(|name| format!("Invalid or inactive category: {}", name))
                .collect(),
        );
        return Err(AppError::Validation(errors));
    }

    Ok(resolved)
}

/// Name uniqueness holds across active and inactive rows combined:
/// a name colliding with an inactive category reactivates that row
/// (overwriting the description when a new one is supplied) instead of
/// inserting a duplicate; colliding with an active one is a conflict.
/// Returns the category and whether it was reactivated.
pub async fn create_or_reactivate<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    description: Option<String>,
) -> Result<(category::Model, bool), AppError> {
    let trimmed = name.trim();
    let existing = category::Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col(category::Column::Name))).eq(trimmed.to_lowercase()))
        .one(conn)
        .await?;

    let now = chrono::Utc::now().naive_utc();
    match existing {
        Some(found) if found.is_active => {
            Err(AppError::Conflict("Category already exists".to_string()))
        }
        Some(found) => {
            let mut active = found.into_active_model();
            active.is_active = Set(true);
            if let Some(description) = description {
                active.description = Set(Some(description));
            }
            active.updated_at = Set(now);
            Ok((active.update(conn).await?, true))
        }
        None => {
            let created = category::ActiveModel {
                name: Set(trimmed.to_string()),
                description: Set(description),
                is_active: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(conn)
            .await?;
            Ok((created, false))
        }
    }
}

pub async fn soft_delete<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<category::Model, AppError> {
    let found = category::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    if !found.is_active {
        return Err(AppError::Conflict(
            "Category is already inactive".to_string(),
        ));
    }

    let mut active = found.into_active_model();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    Ok(active.update(conn).await?)
}

pub async fn reactivate<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<category::Model, AppError> {
    let found = category::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    if found.is_active {
        return Err(AppError::Conflict("Category is already active".to_string()));
    }

    let mut active = found.into_active_model();
    active.is_active = Set(true);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    Ok(active.update(conn).await?)
}

/// Partial update. A rename must not collide with any other category,
/// active or inactive.
pub async fn update<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    name: Option<String>,
    description: Option<String>,
    is_active: Option<bool>,
) -> Result<category::Model, AppError> {
    let found = category::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    if let Some(new_name) = &name {
        let collision = category::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(category::Column::Name)))
                    .eq(new_name.trim().to_lowercase()),
            )
            .filter(category::Column::Id.ne(id))
            .one(conn)
            .await?;
        if collision.is_some() {
            return Err(AppError::Conflict("Category already exists".to_string()));
        }
    }

    let mut active = found.into_active_model();
    if let Some(new_name) = name {
        active.name = Set(new_name.trim().to_string());
    }
    if let Some(description) = description {
        active.description = Set(Some(description));
    }
    if let Some(is_active) = is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    Ok(active.update(conn).await?)
}

/// Flip every inactive category back to active; returns how many rows
/// changed.
pub async fn bulk_activate<C: ConnectionTrait>(conn: &C) -> Result<u64, AppError> {
    let result = category::Entity::update_many()
        .col_expr(category::Column::IsActive, Expr::value(true))
        .col_expr(
            category::Column::UpdatedAt,
            Expr::value(chrono::Utc::now().naive_utc()),
        )
        .filter(category::Column::IsActive.eq(false))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

pub async fn list_active_with_counts(
    db: &sea_orm::DatabaseConnection,
) -> Result<Vec<(category::Model, u64)>, AppError> {
    let categories = category::Entity::find()
        .filter(category::Column::IsActive.eq(true))
        .order_by_asc(category::Column::Id)
        .all(db)
        .await?;

    let products = categories
        .load_many_to_many(
            product::Entity::find().filter(product::Column::IsActive.eq(true)),
            product_category::Entity,
            db,
        )
        .await?;

    Ok(categories
        .into_iter()
        .zip(products)
        .map(|(category, products)| (category, products.len() as u64))
        .collect())
}

pub async fn list_inactive(
    db: &sea_orm::DatabaseConnection,
) -> Result<Vec<category::Model>, AppError> {
    Ok(category::Entity::find()
        .filter(category::Column::IsActive.eq(false))
        .order_by_asc(category::Column::Id)
        .all(db)
        .await?)
}

pub async fn find_active_with_active_products(
    db: &sea_orm::DatabaseConnection,
    id: i32,
) -> Result<Option<(category::Model, Vec<product::Model>)>, AppError> {
    let Some(found) = category::Entity::find_by_id(id)
        .filter(category::Column::IsActive.eq(true))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let products = sea_orm::ModelTrait::find_related(&found, product::Entity)
        .filter(product::Column::IsActive.eq(true))
        .all(db)
        .await?;

    Ok(Some((found, products)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn row(id: i32, name: &str, is_active: bool) -> category::Model {
        let at = chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        category::Model {
            id,
            name: name.to_string(),
            description: Some("seeded".to_string()),
            is_active,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn creating_with_inactive_name_reactivates_the_same_row() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(7, "Books", false)]])
            .append_query_results([vec![row(7, "Books", true)]])
            .into_connection();

        let (category, reactivated) = create_or_reactivate(&db, "Books", None).await.unwrap();
        assert_eq!(category.id, 7);
        assert!(category.is_active);
        assert!(reactivated);
    }

    #[tokio::test]
    async fn duplicate_active_name_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(7, "Books", true)]])
            .into_connection();

        let err = create_or_reactivate(&db, "books", None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn reactivating_an_active_category_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(3, "Sports", true)]])
            .into_connection();

        let err = reactivate(&db, 3).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn soft_deleting_an_inactive_category_is_a_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(3, "Sports", false)]])
            .into_connection();

        let err = soft_delete(&db, 3).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn every_invalid_name_is_reported_at_once() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(1, "Electronics", true)]])
            .into_connection();

        let names = vec![
            "Electronics".to_string(),
            "Ghost".to_string(),
            "Phantom".to_string(),
        ];
        let err = resolve_active_by_names(&db, &names).await.unwrap_err();
        match err {
            AppError::Validation(errors) => {
                let messages = &errors["categories"];
                assert_eq!(messages.len(), 2);
                assert!(messages[0].contains("ghost"));
                assert!(messages[1].contains("phantom"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn resolution_preserves_request_order_and_dedupes() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(1, "Electronics", true), row(2, "Books", true)]])
            .into_connection();

        let names = vec![
            " books ".to_string(),
            "Electronics".to_string(),
            "BOOKS".to_string(),
        ];
        let resolved = resolve_active_by_names(&db, &names).await.unwrap();
        let ids: Vec<i32> = resolved.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
