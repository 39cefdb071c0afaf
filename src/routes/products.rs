use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use sea_orm::prelude::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, ModelTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::entities::{category, product};
use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::query::{ProductListParams, ProductQuery};
use crate::repo;
use crate::response::{message_only, ApiResponse};
use crate::services::storage::{self, StorageService};

const MIN_PRICE: i64 = 1_000;
const MAX_PRICE: i64 = 10_000_000;
const MAX_NAME_LEN: usize = 255;

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategorySummary {
    id: i32,
    name: String,
    description: Option<String>,
}

impl From<category::Model> for CategorySummary {
    fn from(category: category::Model) -> Self {
        CategorySummary {
            id: category.id,
            name: category.name,
            description: category.description,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProductResponse {
    id: i32,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    image: Option<String>,
    /// Derived from the stored key; null when the product has no image.
    image_url: Option<String>,
    is_active: bool,
    categories: Vec<CategorySummary>,
    created_at: chrono::NaiveDateTime,
    updated_at: chrono::NaiveDateTime,
}

impl ProductResponse {
    pub(crate) fn new(product: product::Model, categories: Vec<category::Model>) -> Self {
        let image_url = product.image.as_deref().map(storage::public_url);
        ProductResponse {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            image: product.image,
            image_url,
            is_active: product.is_active,
            categories: categories.into_iter().map(CategorySummary::from).collect(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }

    /// Product without its category list, for payloads where the
    /// categories are the enclosing context.
    pub(crate) fn bare(product: product::Model) -> Self {
        Self::new(product, Vec::new())
    }
}

#[derive(Debug)]
struct ImageUpload {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Raw multipart fields as received; validation happens afterwards so
/// every offending field can be reported in one response.
#[derive(Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<String>,
    stock: Option<String>,
    is_active: Option<String>,
    categories: Option<Vec<String>>,
    image: Option<ImageUpload>,
}

async fn read_product_form(mut multipart: Multipart) -> Result<ProductForm, AppError> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "name" => form.name = Some(text(field).await?),
            "description" => form.description = Some(text(field).await?),
            "price" => form.price = Some(text(field).await?),
            "stock" => form.stock = Some(text(field).await?),
            "is_active" => form.is_active = Some(text(field).await?),
            "categories" | "categories[]" => {
                let raw = text(field).await?;
                let entries = form.categories.get_or_insert_with(Vec::new);
                entries.extend(
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty()),
                );
            }
            "image" => {
                let filename = field.file_name().unwrap_or("unknown").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| {
                        AppError::BadRequest("Failed to read image bytes".to_string())
                    })?
                    .to_vec();
                form.image = Some(ImageUpload {
                    filename,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|_| AppError::BadRequest("Invalid multipart data".to_string()))
}

fn add_error(errors: &mut BTreeMap<String, Vec<String>>, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn check_name(errors: &mut BTreeMap<String, Vec<String>>, raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() {
        add_error(errors, "name", "The name field is required");
        return None;
    }
    if name.chars().count() > MAX_NAME_LEN {
        add_error(
            errors,
            "name",
            "The name may not be greater than 255 characters",
        );
        return None;
    }
    Some(name.to_string())
}

fn check_price(errors: &mut BTreeMap<String, Vec<String>>, raw: &str) -> Option<Decimal> {
    let Ok(price) = Decimal::from_str(raw.trim()) else {
        add_error(errors, "price", "The price must be a number");
        return None;
    };
    if price < Decimal::from(MIN_PRICE) || price > Decimal::from(MAX_PRICE) {
        add_error(
            errors,
            "price",
            "The price must be between 1000 and 10000000",
        );
        return None;
    }
    Some(price)
}

fn check_stock(errors: &mut BTreeMap<String, Vec<String>>, raw: &str) -> Option<i32> {
    let Ok(stock) = raw.trim().parse::<i32>() else {
        add_error(errors, "stock", "The stock must be an integer");
        return None;
    };
    if stock < 0 {
        add_error(errors, "stock", "The stock must be at least 0");
        return None;
    }
    Some(stock)
}

fn check_bool(errors: &mut BTreeMap<String, Vec<String>>, field: &str, raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => {
            add_error(
                errors,
                field,
                &format!("The {} field must be true or false", field),
            );
            None
        }
    }
}

fn check_image(errors: &mut BTreeMap<String, Vec<String>>, upload: &ImageUpload) -> bool {
    match storage::validate_image_upload(&upload.content_type, &upload.bytes) {
        Ok(()) => true,
        Err(message) => {
            add_error(errors, "image", &message);
            false
        }
    }
}

#[derive(Debug)]
struct CreateProduct {
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    categories: Vec<String>,
    image: ImageUpload,
}

fn validate_create(form: ProductForm) -> Result<CreateProduct, AppError> {
    let mut errors = BTreeMap::new();

    let name = match &form.name {
        Some(raw) => check_name(&mut errors, raw),
        None => {
            add_error(&mut errors, "name", "The name field is required");
            None
        }
    };

    let description = match form.description {
        Some(raw) if !raw.trim().is_empty() => Some(raw),
        _ => {
            add_error(&mut errors, "description", "The description field is required");
            None
        }
    };

    let price = match &form.price {
        Some(raw) => check_price(&mut errors, raw),
        None => {
            add_error(&mut errors, "price", "The price field is required");
            None
        }
    };

    let stock = match &form.stock {
        Some(raw) => check_stock(&mut errors, raw),
        None => {
            add_error(&mut errors, "stock", "The stock field is required");
            None
        }
    };

    let categories = match form.categories {
        Some(names) if !names.is_empty() => Some(names),
        _ => {
            add_error(&mut errors, "categories", "The categories field is required");
            None
        }
    };

    let image = match form.image {
        Some(upload) => {
            if check_image(&mut errors, &upload) {
                Some(upload)
            } else {
                None
            }
        }
        None => {
            add_error(&mut errors, "image", "The image field is required");
            None
        }
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(CreateProduct {
        name: name.unwrap(),
        description: description.unwrap(),
        price: price.unwrap(),
        stock: stock.unwrap(),
        categories: categories.unwrap(),
        image: image.unwrap(),
    })
}

#[derive(Default, Debug)]
struct UpdateProduct {
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    stock: Option<i32>,
    is_active: Option<bool>,
    categories: Option<Vec<String>>,
    image: Option<ImageUpload>,
}

fn validate_update(form: ProductForm) -> Result<UpdateProduct, AppError> {
    let mut errors = BTreeMap::new();
    let mut update = UpdateProduct::default();

    if let Some(raw) = &form.name {
        update.name = check_name(&mut errors, raw);
    }
    if let Some(raw) = form.description {
        update.description = Some(raw);
    }
    if let Some(raw) = &form.price {
        update.price = check_price(&mut errors, raw);
    }
    if let Some(raw) = &form.stock {
        update.stock = check_stock(&mut errors, raw);
    }
    if let Some(raw) = &form.is_active {
        update.is_active = check_bool(&mut errors, "is_active", raw);
    }
    if let Some(upload) = form.image {
        if check_image(&mut errors, &upload) {
            update.image = Some(upload);
        }
    }
    update.categories = form.categories;

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(update)
}

#[utoipa::path(
    get,
    path = "/products",
    params(
        ProductListParams
    ),
    responses(
        (status = 200, description = "Filtered, paginated list of active products", body = [ProductResponse])
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(db): State<DatabaseConnection>,
    Query(params): Query<ProductListParams>,
) -> Result<Json<ApiResponse<Vec<ProductResponse>>>, AppError> {
    let query = ProductQuery::from_params(&params);
    let (rows, meta) = repo::products::list_active_filtered(&db, &query).await?;

    let data: Vec<ProductResponse> = rows
        .into_iter()
        .map(|(product, categories)| ProductResponse::new(product, categories))
        .collect();

    println!(
        "Products | GET /products | page={} of {} | total={} | res=200",
        meta.current_page, meta.last_page, meta.total
    );
    Ok(Json(ApiResponse::page(data, meta, query.filters())))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Active product with its active categories", body = ProductResponse),
        (status = 404, description = "Product missing or inactive")
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ProductResponse>>, AppError> {
    let (product, categories) = repo::products::find_active_with_categories(&db, id)
        .await?
        .ok_or(AppError::NotFound("Product not found".to_string()))?;

    Ok(Json(ApiResponse::data(ProductResponse::new(
        product, categories,
    ))))
}

async fn insert_product(
    txn: &DatabaseTransaction,
    input: &CreateProduct,
    image_key: &str,
    category_ids: &[i32],
) -> Result<product::Model, AppError> {
    let now = chrono::Utc::now().naive_utc();
    let created = product::ActiveModel {
        name: Set(input.name.clone()),
        description: Set(Some(input.description.clone())),
        price: Set(input.price),
        stock: Set(input.stock),
        image: Set(Some(image_key.to_string())),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    repo::products::sync_categories(txn, created.id, category_ids).await?;
    Ok(created)
}

#[utoipa::path(
    post,
    path = "/products",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Product created successfully", body = ProductResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 422, description = "Validation failure, every offending field listed"),
        (status = 500, description = "Transactional failure, uploaded file removed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), AppError> {
    let form = read_product_form(multipart).await?;
    let input = validate_create(form)?;

    // 422 with every invalid name before anything is uploaded or written
    let categories = repo::categories::resolve_active_by_names(&db, &input.categories).await?;
    let category_ids: Vec<i32> = categories.iter().map(|c| c.id).collect();

    let storage = StorageService::new().await;
    storage.ensure_bucket_exists().await?;
    let image_key = storage::image_object_key(&input.image.filename);
    storage
        .put_object(
            &image_key,
            input.image.bytes.clone(),
            &input.image.content_type,
        )
        .await?;

    let txn = db.begin().await?;
    let created = match insert_product(&txn, &input, &image_key, &category_ids).await {
        Ok(product) => product,
        Err(e) => {
            txn.rollback().await.ok();
            // The row never landed, so the fresh upload must not linger
            let _ = storage.delete_object(&image_key).await;
            eprintln!("Products | POST /products | create failed: {:?}", e);
            return Err(AppError::InternalServerError(
                "Failed to create product".to_string(),
            ));
        }
    };
    if let Err(e) = txn.commit().await {
        let _ = storage.delete_object(&image_key).await;
        eprintln!("Products | POST /products | commit failed: {}", e);
        return Err(AppError::InternalServerError(
            "Failed to create product".to_string(),
        ));
    }

    println!(
        "Products | POST /products | admin={} | id={} | res=201",
        auth_user.email, created.id
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            ProductResponse::new(created, categories),
            "Product created successfully",
        )),
    ))
}

async fn apply_update(
    txn: &DatabaseTransaction,
    current: product::Model,
    input: &UpdateProduct,
    new_image_key: Option<&str>,
    category_ids: Option<&[i32]>,
) -> Result<product::Model, AppError> {
    let id = current.id;
    let mut active = current.into_active_model();

    if let Some(name) = &input.name {
        active.name = Set(name.clone());
    }
    if let Some(description) = &input.description {
        active.description = Set(Some(description.clone()));
    }
    if let Some(price) = input.price {
        active.price = Set(price);
    }
    if let Some(stock) = input.stock {
        active.stock = Set(stock);
    }
    if let Some(is_active) = input.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(key) = new_image_key {
        active.image = Set(Some(key.to_string()));
    }
    active.updated_at = Set(chrono::Utc::now().naive_utc());

    let updated = active.update(txn).await?;

    if let Some(ids) = category_ids {
        repo::products::sync_categories(txn, id, ids).await?;
    }

    Ok(updated)
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Product updated successfully", body = ProductResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Validation failure"),
        (status = 500, description = "Transactional failure, prior image left in place")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ProductResponse>>, AppError> {
    let form = read_product_form(multipart).await?;

    let current = product::Entity::find_by_id(id)
        .one(&db)
        .await?
        .ok_or(AppError::NotFound("Product not found".to_string()))?;

    let input = validate_update(form)?;

    let resolved = match &input.categories {
        Some(names) => Some(repo::categories::resolve_active_by_names(&db, names).await?),
        None => None,
    };
    let category_ids: Option<Vec<i32>> = resolved
        .as_ref()
        .map(|categories| categories.iter().map(|c| c.id).collect());

    let storage = StorageService::new().await;
    let old_image_key = current.image.clone();
    let new_image_key = match &input.image {
        Some(upload) => {
            storage.ensure_bucket_exists().await?;
            let key = storage::image_object_key(&upload.filename);
            storage
                .put_object(&key, upload.bytes.clone(), &upload.content_type)
                .await?;
            Some(key)
        }
        None => None,
    };

    let txn = db.begin().await?;
    let updated = match apply_update(
        &txn,
        current,
        &input,
        new_image_key.as_deref(),
        category_ids.as_deref(),
    )
    .await
    {
        Ok(product) => product,
        Err(e) => {
            txn.rollback().await.ok();
            // Keep the prior image referenced; drop only the new upload
            if let Some(key) = &new_image_key {
                let _ = storage.delete_object(key).await;
            }
            eprintln!("Products | PUT /products/{} | update failed: {:?}", id, e);
            return Err(AppError::InternalServerError(
                "Failed to update product".to_string(),
            ));
        }
    };
    if let Err(e) = txn.commit().await {
        if let Some(key) = &new_image_key {
            let _ = storage.delete_object(key).await;
        }
        eprintln!("Products | PUT /products/{} | commit failed: {}", id, e);
        return Err(AppError::InternalServerError(
            "Failed to update product".to_string(),
        ));
    }

    // The old file goes away only after the new key is durably committed
    if new_image_key.is_some() {
        if let Some(old_key) = old_image_key {
            let _ = storage.delete_object(&old_key).await;
        }
    }

    let categories = updated
        .find_related(category::Entity)
        .filter(category::Column::IsActive.eq(true))
        .all(&db)
        .await?;

    println!(
        "Products | PUT /products/{} | admin={} | res=200",
        id, auth_user.email
    );
    Ok(Json(ApiResponse::with_message(
        ProductResponse::new(updated, categories),
        "Product updated successfully",
    )))
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct DeleteProductParams {
    /// Non-default hard delete: detach associations and remove the row
    /// and its image instead of deactivating.
    pub force: Option<bool>,
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID"),
        DeleteProductParams
    ),
    responses(
        (status = 200, description = "Product deleted successfully"),
        (status = 400, description = "Product is already inactive"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Product not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(db): State<DatabaseConnection>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Query(params): Query<DeleteProductParams>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let current = product::Entity::find_by_id(id)
        .one(&db)
        .await?
        .ok_or(AppError::NotFound("Product not found".to_string()))?;

    if params.force.unwrap_or(false) {
        let image_key = current.image.clone();
        let txn = db.begin().await?;
        let outcome = async {
            repo::products::detach_all(&txn, id).await?;
            product::Entity::delete_by_id(id).exec(&txn).await?;
            Ok::<(), AppError>(())
        }
        .await;
        if let Err(e) = outcome {
            txn.rollback().await.ok();
            eprintln!("Products | DELETE /products/{} | purge failed: {:?}", id, e);
            return Err(AppError::InternalServerError(
                "Failed to delete product".to_string(),
            ));
        }
        txn.commit().await?;

        if let Some(key) = image_key {
            let storage = StorageService::new().await;
            let _ = storage.delete_object(&key).await;
        }

        println!(
            "Products | DELETE /products/{} | admin={} | purged | res=200",
            id, auth_user.email
        );
        return Ok(Json(message_only("Product deleted successfully")));
    }

    if !current.is_active {
        return Err(AppError::Conflict("Product is already inactive".to_string()));
    }

    let mut active = current.into_active_model();
    active.is_active = Set(false);
    active.updated_at = Set(chrono::Utc::now().naive_utc());
    active.update(&db).await?;

    println!(
        "Products | DELETE /products/{} | admin={} | res=200",
        id, auth_user.email
    );
    Ok(Json(message_only("Product deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_form() -> ProductForm {
        ProductForm {
            name: Some("Mechanical Keyboard".to_string()),
            description: Some("Tenkeyless, hot-swappable".to_string()),
            price: Some("2500".to_string()),
            stock: Some("10".to_string()),
            is_active: None,
            categories: Some(vec!["Electronics".to_string()]),
            image: Some(png_upload()),
        }
    }

    fn png_upload() -> ImageUpload {
        let mut bytes = vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
        bytes.extend_from_slice(&[0; 32]);
        ImageUpload {
            filename: "photo.png".to_string(),
            content_type: "image/png".to_string(),
            bytes,
        }
    }

    fn validation_errors(err: AppError) -> BTreeMap<String, Vec<String>> {
        match err {
            AppError::Validation(errors) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_create_form_passes() {
        let input = validate_create(base_form()).unwrap();
        assert_eq!(input.name, "Mechanical Keyboard");
        assert_eq!(input.price, Decimal::from(2500));
        assert_eq!(input.stock, 10);
    }

    #[test]
    fn empty_create_form_enumerates_every_missing_field() {
        let errors = validation_errors(validate_create(ProductForm::default()).unwrap_err());
        let fields: Vec<&str> = errors.keys().map(String::as_str).collect();
        assert_eq!(
            fields,
            vec!["categories", "description", "image", "name", "price", "stock"]
        );
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let mut form = base_form();
        form.price = Some("1000".to_string());
        assert!(validate_create(form).is_ok());

        let mut form = base_form();
        form.price = Some("10000000".to_string());
        assert!(validate_create(form).is_ok());

        let mut form = base_form();
        form.price = Some("999.99".to_string());
        let errors = validation_errors(validate_create(form).unwrap_err());
        assert!(errors["price"][0].contains("between"));

        let mut form = base_form();
        form.price = Some("10000000.01".to_string());
        assert!(validate_create(form).is_err());
    }

    #[test]
    fn non_numeric_price_and_negative_stock_are_reported_together() {
        let mut form = base_form();
        form.price = Some("a lot".to_string());
        form.stock = Some("-3".to_string());
        let errors = validation_errors(validate_create(form).unwrap_err());
        assert!(errors["price"][0].contains("number"));
        assert!(errors["stock"][0].contains("at least 0"));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let mut form = base_form();
        form.name = Some("x".repeat(256));
        let errors = validation_errors(validate_create(form).unwrap_err());
        assert!(errors["name"][0].contains("255"));
    }

    #[test]
    fn update_with_no_fields_is_a_valid_partial_update() {
        let update = validate_update(ProductForm::default()).unwrap();
        assert!(update.name.is_none());
        assert!(update.categories.is_none());
    }

    #[test]
    fn update_keeps_explicit_empty_category_list() {
        let form = ProductForm {
            categories: Some(Vec::new()),
            ..ProductForm::default()
        };
        let update = validate_update(form).unwrap();
        assert_eq!(update.categories, Some(Vec::new()));
    }

    #[test]
    fn update_validates_provided_fields_only() {
        let form = ProductForm {
            price: Some("12".to_string()),
            is_active: Some("maybe".to_string()),
            ..ProductForm::default()
        };
        let errors = validation_errors(validate_update(form).unwrap_err());
        let fields: Vec<&str> = errors.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["is_active", "price"]);
    }

    #[test]
    fn bad_image_upload_fails_validation_before_any_write() {
        let mut form = base_form();
        form.image = Some(ImageUpload {
            filename: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            bytes: b"hello".to_vec(),
        });
        let errors = validation_errors(validate_create(form).unwrap_err());
        assert!(errors["image"][0].contains("must be an image"));
    }
}
