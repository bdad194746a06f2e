use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connect_with_settings;

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "users",
        "bookings",
        "payments",
        "employees",
        "idx_bookings_status",
        "idx_bookings_user_id",
        "idx_bookings_created_at",
        "idx_payments_user_id",
        "idx_payments_provider",
        "idx_payments_status",
        "idx_employees_department",
        "idx_employees_active",
    ];

    #[tokio::test]
    async fn migrations_create_all_managed_objects() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for name in MANAGED_SCHEMA_OBJECTS {
            let count = sqlx::query(
                "SELECT COUNT(*) AS count FROM sqlite_master WHERE name = ?",
            )
            .bind(name)
            .fetch_one(&pool)
            .await
            .expect("schema lookup")
            .get::<i64, _>("count");

            assert_eq!(count, 1, "expected schema object `{name}` to exist");
        }
    }

    #[tokio::test]
    async fn payments_booking_id_is_unique() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let unique = sqlx::query(
            "SELECT COUNT(*) AS count FROM pragma_index_list('payments') WHERE \"unique\" = 1",
        )
        .fetch_one(&pool)
        .await
        .expect("index list")
        .get::<i64, _>("count");

        // booking_id, reference, and the four provider reference columns
        assert!(unique >= 2, "payments table must enforce uniqueness constraints");
    }
}
