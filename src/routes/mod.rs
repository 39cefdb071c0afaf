mod auth;
mod categories;
mod home;
mod product_requests;
pub mod products;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::admin::require_admin;
use crate::middleware::auth::auth_middleware;

// Define the OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // General endpoints
        home::root,
        // Authentication endpoints
        auth::login,
        auth::refresh,
        auth::logout,
        // Product endpoints
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        // Category endpoints
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        categories::reactivate_category,
        categories::bulk_activate_categories,
        categories::list_inactive_categories,
        // Product request endpoints
        product_requests::submit_request,
        product_requests::my_requests,
        product_requests::list_requests,
        product_requests::update_status,
    ),
    components(
        schemas(
            // Auth schemas
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RefreshRequest,
            auth::RefreshResponse,
            auth::LogoutRequest,
            // Product schemas
            products::ProductResponse,
            products::CategorySummary,
            // Category schemas
            categories::CreateCategoryRequest,
            categories::UpdateCategoryRequest,
            categories::CategoryResponse,
            categories::CategoryWithCount,
            categories::CategoryWithProducts,
            // Product request schemas
            product_requests::SubmitRequestPayload,
            product_requests::UpdateStatusPayload,
            product_requests::ProductRequestResponse,
            product_requests::RequesterSummary,
            crate::entities::product_request::Status,
            crate::pagination::PageMeta,
        )
    ),
    tags(
        (name = "General", description = "General API information"),
        (name = "Authentication", description = "Login, token refresh, and logout"),
        (name = "Products", description = "Product catalog browsing and admin CRUD"),
        (name = "Categories", description = "Category listing, lifecycle, and admin CRUD"),
        (name = "Product Requests", description = "Guest product requests and admin review")
    ),
    info(
        title = "CatalogKit API",
        version = "0.1.0",
        description = "A Rust/Axum e-commerce catalog backend with category tagging, image upload, and soft-delete lifecycle",
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

// Add security scheme for JWT Bearer tokens
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer
                )
            ),
        );
    }
}

pub fn create_routes(db: DatabaseConnection) -> Router {
    // Swagger UI (stateless)
    let swagger_router: Router = SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into();

    // Authenticated routes
    let protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/product-requests", post(product_requests::submit_request))
        .route("/my-product-requests", get(product_requests::my_requests))
        .layer(middleware::from_fn(auth_middleware));

    // Admin-only routes; the gate runs before any handler validation
    let admin_routes = Router::new()
        .route("/products", post(products::create_product))
        .route("/products/{id}", put(products::update_product))
        .route("/products/{id}", delete(products::delete_product))
        .route("/categories", post(categories::create_category))
        .route("/categories/{id}", put(categories::update_category))
        .route("/categories/{id}", delete(categories::delete_category))
        .route(
            "/categories/{id}/reactivate",
            post(categories::reactivate_category),
        )
        .route(
            "/categories/bulk-activate",
            post(categories::bulk_activate_categories),
        )
        .route(
            "/categories/inactive",
            get(categories::list_inactive_categories),
        )
        .route("/product-requests", get(product_requests::list_requests))
        .route(
            "/product-requests/{id}/status",
            put(product_requests::update_status),
        )
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn(auth_middleware));

    // Public routes (no auth required) and merge all together
    let app_routes = Router::new()
        .route("/", get(home::root))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/products", get(products::list_products))
        .route("/products/{id}", get(products::get_product))
        .route("/categories", get(categories::list_categories))
        .route("/categories/{id}", get(categories::get_category))
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(db);

    // Merge Swagger UI (which has no state) with the rest
    Router::new()
        .merge(swagger_router)
        .merge(app_routes)
}
