mod config;
mod entities;
mod error;
mod middleware;
mod pagination;
mod query;
mod repo;
mod response;
mod routes;
mod services;

use migration::{Migrator, MigratorTrait};
use routes::create_routes;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = config::get_config();

    let db = sea_orm::Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    // build our application using the routes module
    let app = create_routes(db);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .unwrap();
    println!("Listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
