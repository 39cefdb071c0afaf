use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, LoaderTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::{product, product_request, user};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::products::ProductResponse;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitRequestPayload {
    product_id: Option<i32>,
    quantity: Option<i32>,
    notes: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateStatusPayload {
    status: String,
    notes: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RequesterSummary {
    id: i32,
    name: String,
    email: String,
}

impl From<user::Model> for RequesterSummary {
    fn from(user: user::Model) -> Self {
        RequesterSummary {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProductRequestResponse {
    id: i32,
    user_id: i32,
    product_id: i32,
    quantity: i32,
    notes: Option<String>,
    status: product_request::Status,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<RequesterSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product: Option<ProductResponse>,
}

impl ProductRequestResponse {
    fn new(
        request: product_request::Model,
        user: Option<user::Model>,
        product: Option<product::Model>,
    ) -> Self {
        ProductRequestResponse {
            id: request.id,
            user_id: request.user_id,
            product_id: request.product_id,
            quantity: request.quantity,
            notes: request.notes,
            status: request.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
            user: user.map(RequesterSummary::from),
            product: product.map(ProductResponse::bare),
        }
    }
}

#[utoipa::path(
    post,
    path = "/product-requests",
    request_body = SubmitRequestPayload,
    responses(
        (status = 201, description = "Product request submitted successfully", body = ProductRequestResponse),
        (status = 400, description = "Insufficient stock"),
        (status = 404, description = "Product not available"),
        (status = 422, description = "Validation failure")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Product Requests"
)]
pub async fn submit_request(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<SubmitRequestPayload>,
) -> Result<(StatusCode, Json<ApiResponse<ProductRequestResponse>>), AppError> {
    let mut errors = BTreeMap::new();
    if payload.product_id.is_none() {
        errors.insert(
            "product_id".to_string(),
            vec!["The product_id field is required".to_string()],
        );
    }
    match payload.quantity {
        None => {
            errors.insert(
                "quantity".to_string(),
                vec!["The quantity field is required".to_string()],
            );
        }
        Some(quantity) if quantity < 1 => {
            errors.insert(
                "quantity".to_string(),
                vec!["The quantity must be at least 1".to_string()],
            );
        }
        Some(_) => {}
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let product_id = payload.product_id.unwrap();
    let quantity = payload.quantity.unwrap();

    // Requests can only target products a guest could actually see
    let found = product::Entity::find_by_id(product_id)
        .filter(product::Column::IsActive.eq(true))
        .one(&db)
        .await?
        .ok_or(AppError::NotFound("Product not available".to_string()))?;

    if found.stock < quantity {
        return Err(AppError::BadRequest("Insufficient stock".to_string()));
    }

    let now = chrono::Utc::now().naive_utc();
    let created = product_request::ActiveModel {
        user_id: Set(auth_user.id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        notes: Set(payload.notes),
        status: Set(product_request::Status::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await?;

    println!(
        "ProductRequests | POST /product-requests | user={} | product={} | res=201",
        auth_user.email, product_id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            ProductRequestResponse::new(created, None, None),
            "Product request submitted successfully",
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/my-product-requests",
    responses(
        (status = 200, description = "The caller's own requests with their products", body = [ProductRequestResponse])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Product Requests"
)]
pub async fn my_requests(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<ProductRequestResponse>>>, AppError> {
    let requests = product_request::Entity::find()
        .filter(product_request::Column::UserId.eq(auth_user.id))
        .order_by_desc(product_request::Column::CreatedAt)
        .all(&db)
        .await?;

    let products = requests.load_one(product::Entity, &db).await?;

    let data = requests
        .into_iter()
        .zip(products)
        .map(|(request, product)| ProductRequestResponse::new(request, None, product))
        .collect();

    Ok(Json(ApiResponse::data(data)))
}

#[utoipa::path(
    get,
    path = "/product-requests",
    responses(
        (status = 200, description = "All requests with requester and product", body = [ProductRequestResponse]),
        (status = 403, description = "Caller is not an admin")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Product Requests"
)]
pub async fn list_requests(
    State(db): State<DatabaseConnection>,
) -> Result<Json<ApiResponse<Vec<ProductRequestResponse>>>, AppError> {
    let requests = product_request::Entity::find()
        .order_by_desc(product_request::Column::CreatedAt)
        .all(&db)
        .await?;

    let users = requests.load_one(user::Entity, &db).await?;
    let products = requests.load_one(product::Entity, &db).await?;

    let data = requests
        .into_iter()
        .zip(users)
        .zip(products)
        .map(|((request, user), product)| ProductRequestResponse::new(request, user, product))
        .collect();

    Ok(Json(ApiResponse::data(data)))
}

#[utoipa::path(
    put,
    path = "/product-requests/{id}/status",
    params(
        ("id" = i32, Path, description = "Product request ID")
    ),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Product request status updated successfully", body = ProductRequestResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Product request not found"),
        (status = 422, description = "Unknown status value")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Product Requests"
)]
pub async fn update_status(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<ApiResponse<ProductRequestResponse>>, AppError> {
    let status = parse_status(&payload.status)?;

    let found = product_request::Entity::find_by_id(id)
        .one(&db)
        .await?
        .ok_or(AppError::NotFound("Product request not found".to_string()))?;

    let mut active = found.into_active_model();
    active.status = Set(status);
    if let Some(notes) = payload.notes {
        active.notes = Set(Some(notes));
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = active.update(&db).await?;

    println!(
        "ProductRequests | PUT /product-requests/{}/status | admin={} | res=200",
        id, auth_user.email
    );
    Ok(Json(ApiResponse::with_message(
        ProductRequestResponse::new(updated, None, None),
        "Product request status updated successfully",
    )))
}

fn parse_status(raw: &str) -> Result<product_request::Status, AppError> {
    match raw {
        "pending" => Ok(product_request::Status::Pending),
        "approved" => Ok(product_request::Status::Approved),
        "rejected" => Ok(product_request::Status::Rejected),
        _ => Err(AppError::validation(
            "status",
            "The status must be one of: pending, approved, rejected",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_values_are_constrained() {
        assert_eq!(
            parse_status("approved").unwrap(),
            product_request::Status::Approved
        );
        assert!(matches!(
            parse_status("shipped"),
            Err(AppError::Validation(_))
        ));
    }
}
