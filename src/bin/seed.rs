use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use bar_orders_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let manager_id = ensure_user(&pool, "manager@example.com", "manager123", "manager").await?;
    let server_id = ensure_user(&pool, "server@example.com", "server123", "server").await?;
    let client_id = ensure_user(&pool, "client@example.com", "client123", "client").await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Manager: {manager_id}, Server: {server_id}, Client: {client_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // (name, description, type, price, stock_unit, conversion_factor, initial base units)
    let products: Vec<(&str, &str, &str, i64, Option<&str>, i32, Option<i32>)> = vec![
        (
            "Poulet Yassa",
            "Grilled chicken in onion sauce",
            "dish",
            3500,
            None,
            1,
            None,
        ),
        ("Thieb Rouge", "Rice with tomato sauce", "dish", 2500, None, 1, None),
        ("Coca-Cola 33cl", "Soft drink", "drink", 600, Some("unit"), 1, Some(48)),
        ("Flag 33cl", "Lager", "drink", 1000, Some("unit"), 1, Some(72)),
        (
            "Marlboro Rouge",
            "Sold per cigarette, packet of 20",
            "cigarette",
            250,
            Some("packet"),
            20,
            Some(65),
        ),
        ("Oeuf dur", "Boiled egg, plate of 30", "egg", 150, Some("plate"), 30, Some(90)),
        ("Supplement Frites", "Side of fries", "supplement", 500, None, 1, None),
        ("Supplement Alloco", "Fried plantain", "supplement", 300, None, 1, None),
        ("Service table VIP", "VIP table service", "service", 5000, None, 1, None),
    ];

    for (name, desc, ptype, price, unit, factor, stock) in products {
        let product_id = Uuid::new_v4();
        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, description, product_type, price, stock_unit, conversion_factor)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(product_id)
        .bind(name)
        .bind(desc)
        .bind(ptype)
        .bind(price)
        .bind(unit)
        .bind(factor)
        .fetch_optional(pool)
        .await?;

        if let (Some((id,)), Some(quantity)) = (inserted, stock) {
            let packets = if factor > 1 { Some(quantity / factor) } else { None };
            let loose = if factor > 1 { Some(quantity % factor) } else { None };
            sqlx::query(
                r#"
                INSERT INTO stocks (id, product_id, quantity, quantity_packets, quantity_plates, quantity_units)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (product_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(quantity)
            .bind(if ptype == "cigarette" { packets } else { None })
            .bind(if ptype == "egg" { packets } else { None })
            .bind(loose)
            .execute(pool)
            .await?;
        }
    }

    // Offer both supplements on every dish.
    sqlx::query(
        r#"
        INSERT INTO product_supplements (id, dish_id, supplement_id)
        SELECT gen_random_uuid(), d.id, s.id
        FROM products d
        CROSS JOIN products s
        WHERE d.product_type = 'dish' AND s.product_type = 'supplement'
        ON CONFLICT (dish_id, supplement_id) DO NOTHING
        "#,
    )
    .execute(pool)
    .await?;

    println!("Seeded catalog");
    Ok(())
}
