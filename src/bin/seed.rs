use chrono::Duration;
use rust_decimal::Decimal;
use storefront_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    middleware::auth::{ADMIN_ROLE, USER_ROLE, issue_token},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 2).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "Admin", ADMIN_ROLE).await?;
    let user_id = ensure_user(&pool, "user@example.com", "Shopper", USER_ROLE).await?;
    let address_id = ensure_address(&pool, user_id).await?;
    let category_id = ensure_category(&pool, "Apparel").await?;
    seed_products(&pool, category_id).await?;

    let ttl = Duration::days(7);
    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}, Address ID: {address_id}");
    println!(
        "Admin token: Bearer {}",
        issue_token(&config.jwt_secret, admin_id, ADMIN_ROLE, ttl)?
    );
    println!(
        "User token:  Bearer {}",
        issue_token(&config.jwt_secret, user_id, USER_ROLE, ttl)?
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, name, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_address(pool: &sqlx::PgPool, user_id: Uuid) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM addresses WHERE user_id = $1 LIMIT 1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO addresses (id, user_id, address, city, country, postal_code, phone)
        VALUES ($1, $2, '1 Crab Lane', 'Portland', 'US', '97201', '555-0100')
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn ensure_category(pool: &sqlx::PgPool, name: &str) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_products(pool: &sqlx::PgPool, category_id: Uuid) -> anyhow::Result<()> {
    let products = [
        ("Axum Hoodie", "Warm hoodie for Rustaceans", Decimal::new(5500, 2), 50),
        ("Ferris Mug", "Coffee tastes better with Ferris", Decimal::new(1200, 2), 100),
        ("Rust Sticker Pack", "Decorate your laptop", Decimal::new(500, 2), 200),
        ("E-book: Async Rust", "Learn async Rust patterns", Decimal::new(2500, 2), 75),
    ];

    for (name, desc, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, category_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(stock)
        .bind(category_id)
        .execute(pool)
        .await?;
    }

    for (size, color, stock) in [("S", "black", 10), ("M", "black", 15), ("L", "grey", 5)] {
        sqlx::query(
            r#"
            INSERT INTO variants (id, product_id, size, color, stock)
            SELECT $1, id, $2, $3, $4 FROM products WHERE name = 'Axum Hoodie'
            ON CONFLICT (product_id, size, color) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(size)
        .bind(color)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products and variants");
    Ok(())
}
