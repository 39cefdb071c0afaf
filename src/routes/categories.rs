use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::entities::category;
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::repo;
use crate::response::{message_only, ApiResponse};
use crate::routes::products::ProductResponse;

const MAX_NAME_LEN: usize = 255;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCategoryRequest {
    name: String,
    description: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateCategoryRequest {
    name: Option<String>,
    description: Option<String>,
    is_active: Option<bool>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryResponse {
    id: i32,
    name: String,
    description: Option<String>,
    is_active: bool,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl From<category::Model> for CategoryResponse {
    fn from(category: category::Model) -> Self {
        CategoryResponse {
            id: category.id,
            name: category.name,
            description: category.description,
            is_active: category.is_active,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    category: CategoryResponse,
    products_count: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryWithProducts {
    #[serde(flatten)]
    category: CategoryResponse,
    products: Vec<ProductResponse>,
}

fn check_name(name: &str) -> Result<String, AppError> {
    let mut errors = BTreeMap::new();
    let trimmed = name.trim();
    if trimmed.is_empty() {
        errors.insert(
            "name".to_string(),
            vec!["The name field is required".to_string()],
        );
    } else if trimmed.chars().count() > MAX_NAME_LEN {
        errors.insert(
            "name".to_string(),
            vec!["The name may not be greater than 255 characters".to_string()],
        );
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok(trimmed.to_string())
}

#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "Active categories with their active-product counts", body = [CategoryWithCount])
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(db): State<DatabaseConnection>,
) -> Result<Json<ApiResponse<Vec<CategoryWithCount>>>, AppError> {
    let rows = repo::categories::list_active_with_counts(&db).await?;

    let data: Vec<CategoryWithCount> = rows
        .into_iter()
        .map(|(category, products_count)| CategoryWithCount {
            category: category.into(),
            products_count,
        })
        .collect();

    println!("Categories | GET /categories | count={} | res=200", data.len());
    Ok(Json(ApiResponse::data(data)))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Active category with its active products", body = CategoryWithProducts),
        (status = 404, description = "Category missing or inactive")
    ),
    tag = "Categories"
)]
pub async fn get_category(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CategoryWithProducts>>, AppError> {
    let (found, products) = repo::categories::find_active_with_active_products(&db, id)
        .await?
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    // Attached products render without their own category lists here
    let products = products.into_iter().map(ProductResponse::bare).collect();

    Ok(Json(ApiResponse::data(CategoryWithProducts {
        category: found.into(),
        products,
    })))
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created successfully", body = CategoryResponse),
        (status = 200, description = "Inactive category with the same name reactivated", body = CategoryResponse),
        (status = 400, description = "An active category with this name already exists"),
        (status = 403, description = "Caller is not an admin"),
        (status = 422, description = "Validation failure")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Categories"
)]
pub async fn create_category(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), AppError> {
    let name = check_name(&payload.name)?;

    let (found, reactivated) =
        repo::categories::create_or_reactivate(&db, &name, payload.description).await?;

    let (status, message) = if reactivated {
        (StatusCode::OK, "Category reactivated successfully")
    } else {
        (StatusCode::CREATED, "Category created successfully")
    };

    println!(
        "Categories | POST /categories | admin={} | id={} | reactivated={} | res={}",
        auth_user.email,
        found.id,
        reactivated,
        status.as_u16()
    );
    Ok((
        status,
        Json(ApiResponse::with_message(found.into(), message)),
    ))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated successfully", body = CategoryResponse),
        (status = 400, description = "Another category already uses this name"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Category not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Categories"
)]
pub async fn update_category(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryResponse>>, AppError> {
    let name = match payload.name {
        Some(raw) => Some(check_name(&raw)?),
        None => None,
    };

    let updated =
        repo::categories::update(&db, id, name, payload.description, payload.is_active).await?;

    println!(
        "Categories | PUT /categories/{} | admin={} | res=200",
        id, auth_user.email
    );
    Ok(Json(ApiResponse::with_message(
        updated.into(),
        "Category updated successfully",
    )))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category deleted successfully"),
        (status = 400, description = "Category is already inactive"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Category not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Categories"
)]
pub async fn delete_category(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    repo::categories::soft_delete(&db, id).await?;

    println!(
        "Categories | DELETE /categories/{} | admin={} | res=200",
        id, auth_user.email
    );
    Ok(Json(message_only("Category deleted successfully")))
}

#[utoipa::path(
    post,
    path = "/categories/{id}/reactivate",
    params(
        ("id" = i32, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category reactivated successfully", body = CategoryResponse),
        (status = 400, description = "Category is already active"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Category not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Categories"
)]
pub async fn reactivate_category(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CategoryResponse>>, AppError> {
    let reactivated = repo::categories::reactivate(&db, id).await?;

    println!(
        "Categories | POST /categories/{}/reactivate | admin={} | res=200",
        id, auth_user.email
    );
    Ok(Json(ApiResponse::with_message(
        reactivated.into(),
        "Category reactivated successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/categories/bulk-activate",
    responses(
        (status = 200, description = "All inactive categories reactivated"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Categories"
)]
pub async fn bulk_activate_categories(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let activated = repo::categories::bulk_activate(&db).await?;

    println!(
        "Categories | POST /categories/bulk-activate | admin={} | activated={} | res=200",
        auth_user.email, activated
    );
    Ok(Json(ApiResponse::with_message(
        serde_json::json!({ "activated": activated }),
        "Categories activated successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/categories/inactive",
    responses(
        (status = 200, description = "Soft-deleted categories", body = [CategoryResponse]),
        (status = 403, description = "Caller is not an admin")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Categories"
)]
pub async fn list_inactive_categories(
    State(db): State<DatabaseConnection>,
) -> Result<Json<ApiResponse<Vec<CategoryResponse>>>, AppError> {
    let rows = repo::categories::list_inactive(&db).await?;
    Ok(Json(ApiResponse::data(
        rows.into_iter().map(CategoryResponse::from).collect(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_name_is_trimmed_and_bounded() {
        assert_eq!(check_name("  Electronics  ").unwrap(), "Electronics");
        assert!(matches!(check_name("   "), Err(AppError::Validation(_))));
        assert!(matches!(
            check_name(&"x".repeat(256)),
            Err(AppError::Validation(_))
        ));
    }
}
