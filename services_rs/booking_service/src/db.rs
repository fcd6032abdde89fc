use sqlx::postgres::{PgPool, PgPoolOptions};

fn table_name(schema: &Option<String>, name: &str) -> String {
    match schema {
        Some(s) => format!("{s}.{name}"),
        None => name.to_string(),
    }
}

pub async fn connect(db_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(db_url)
        .await
}

pub async fn ensure_schema(pool: &PgPool, db_schema: &Option<String>) -> Result<(), sqlx::Error> {
    if let Some(schema) = db_schema {
        let ddl = format!("CREATE SCHEMA IF NOT EXISTS {schema}");
        let _ = sqlx::query(&ddl).execute(pool).await;
    }

    let users = table_name(db_schema, "users");
    let listings = table_name(db_schema, "listings");
    let bookings = table_name(db_schema, "bookings");
    let payments = table_name(db_schema, "payments");

    let ddls = [
        format!(
            "CREATE TABLE IF NOT EXISTS {users} (\
             id VARCHAR(36) PRIMARY KEY,\
             email VARCHAR(255) NOT NULL UNIQUE,\
             password_hash VARCHAR(255) NOT NULL,\
             full_name VARCHAR(120),\
             role VARCHAR(16) NOT NULL DEFAULT 'tourist',\
             created_at TEXT NOT NULL\
             )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {listings} (\
             id VARCHAR(36) PRIMARY KEY,\
             guide_id VARCHAR(36) NOT NULL,\
             title VARCHAR(200) NOT NULL,\
             location VARCHAR(120),\
             tour_fee_cents BIGINT NOT NULL,\
             max_group_size INTEGER NOT NULL DEFAULT 10,\
             status VARCHAR(16) NOT NULL DEFAULT 'active',\
             created_at TEXT NOT NULL\
             )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {bookings} (\
             id VARCHAR(36) PRIMARY KEY,\
             listing_id VARCHAR(36) NOT NULL,\
             tourist_id VARCHAR(36) NOT NULL,\
             guide_id VARCHAR(36) NOT NULL,\
             booking_date TEXT NOT NULL,\
             num_people INTEGER NOT NULL,\
             total_amount_cents BIGINT NOT NULL,\
             currency VARCHAR(3) NOT NULL,\
             status VARCHAR(16) NOT NULL,\
             created_at TEXT NOT NULL\
             )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {payments} (\
             id VARCHAR(36) PRIMARY KEY,\
             booking_id VARCHAR(36) NOT NULL,\
             tran_id VARCHAR(64) NOT NULL UNIQUE,\
             amount_cents BIGINT NOT NULL,\
             currency VARCHAR(3) NOT NULL,\
             status VARCHAR(16) NOT NULL,\
             created_at TEXT NOT NULL,\
             updated_at TEXT\
             )"
        ),
        format!("CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON {users}(email)"),
        format!("CREATE INDEX IF NOT EXISTS idx_listings_guide ON {listings}(guide_id)"),
        format!("CREATE INDEX IF NOT EXISTS idx_bookings_tourist ON {bookings}(tourist_id)"),
        format!("CREATE INDEX IF NOT EXISTS idx_bookings_guide ON {bookings}(guide_id)"),
        format!("CREATE INDEX IF NOT EXISTS idx_bookings_listing ON {bookings}(listing_id)"),
        format!("CREATE INDEX IF NOT EXISTS idx_bookings_created ON {bookings}(created_at)"),
        format!("CREATE UNIQUE INDEX IF NOT EXISTS idx_payments_tran_id ON {payments}(tran_id)"),
        format!("CREATE INDEX IF NOT EXISTS idx_payments_booking ON {payments}(booking_id)"),
        // One settled payment per booking, enforced at the storage layer.
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_payments_completed_booking ON {payments}(booking_id) WHERE status='completed'"
        ),
    ];

    for ddl in ddls {
        let _ = sqlx::query(&ddl).execute(pool).await;
    }

    let _ = sqlx::query(&format!(
        "ALTER TABLE {bookings} ADD COLUMN IF NOT EXISTS currency VARCHAR(3)"
    ))
    .execute(pool)
    .await;
    let _ = sqlx::query(&format!(
        "ALTER TABLE {payments} ADD COLUMN IF NOT EXISTS updated_at TEXT"
    ))
    .execute(pool)
    .await;
    let _ = sqlx::query(&format!(
        "ALTER TABLE {listings} ADD COLUMN IF NOT EXISTS max_group_size INTEGER DEFAULT 10"
    ))
    .execute(pool)
    .await;

    Ok(())
}
