use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use migration::{Migrator, MigratorTrait};
use rand::Rng;
use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};
use std::env;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db = Database::connect(database_url)
        .await
        .expect("Failed to connect to database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    // Admin account
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(b"admin123", &salt)
        .expect("Failed to hash password")
        .to_string();

    db.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "INSERT INTO users (name, email, password, is_admin, created_at) \
         VALUES ($1, $2, $3, TRUE, NOW()) ON CONFLICT (email) DO NOTHING",
        [
            "Admin".into(),
            "admin@example.com".into(),
            password_hash.into(),
        ],
    ))
    .await
    .expect("Failed to seed admin user");

    let categories = [
        ("Electronics", "Electronic devices and accessories"),
        ("Clothing", "Fashion and apparel"),
        ("Books", "Books and educational materials"),
        ("Home & Garden", "Home improvement and gardening"),
        ("Sports", "Sports equipment and accessories"),
    ];

    let mut category_ids: Vec<i32> = Vec::new();
    for (name, description) in categories {
        let row = db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "INSERT INTO categories (name, description, is_active, created_at, updated_at) \
                 VALUES ($1, $2, TRUE, NOW(), NOW()) RETURNING id",
                [name.into(), description.into()],
            ))
            .await
            .expect("Failed to seed category")
            .expect("Category insert returned no row");
        category_ids.push(row.try_get("", "id").unwrap());
    }

    let mut rng = rand::thread_rng();
    for i in 1..=50 {
        let price: i64 = 1_000 + rng.gen_range(0..90) * 1_000;
        let stock: i32 = rng.gen_range(0..25);
        let row = db
            .query_one(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "INSERT INTO products (name, description, price, stock, is_active, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, TRUE, NOW(), NOW()) RETURNING id",
                [
                    format!("Sample Product {}", i).into(),
                    format!("Seeded catalog item #{}", i).into(),
                    price.into(),
                    stock.into(),
                ],
            ))
            .await
            .expect("Failed to seed product")
            .expect("Product insert returned no row");
        let product_id: i32 = row.try_get("", "id").unwrap();

        // Each product gets 1-3 distinct categories
        let keep = rng.gen_range(1..=3);
        let mut picks = category_ids.clone();
        while picks.len() > keep {
            let drop_at = rng.gen_range(0..picks.len());
            picks.remove(drop_at);
        }
        for category_id in picks {
            db.execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "INSERT INTO product_categories (product_id, category_id, created_at) \
                 VALUES ($1, $2, NOW())",
                [product_id.into(), category_id.into()],
            ))
            .await
            .expect("Failed to attach category");
        }
    }

    println!("Database seeded successfully");
}
