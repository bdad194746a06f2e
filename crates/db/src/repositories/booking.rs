use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use stayline_core::chrono::{DateTime, Utc};
use stayline_core::domain::booking::{Booking, BookingId, BookingStatus, PaymentMethod};
use stayline_core::domain::user::UserId;
use stayline_core::search::{BookingSearch, Page, PageRequest};

use super::{
    parse_decimal, parse_opt_decimal, parse_opt_rfc3339, parse_rfc3339, parse_uuid,
    RepositoryError,
};
use crate::DbPool;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError>;
    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError>;
    async fn update(&self, booking: &Booking) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &BookingId) -> Result<bool, RepositoryError>;
    async fn list_by_status(&self, status: BookingStatus)
        -> Result<Vec<Booking>, RepositoryError>;
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Booking>, RepositoryError>;
    async fn list_all(&self) -> Result<Vec<Booking>, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;

    /// Conjunction filter with paging. `sort_column` must already have passed
    /// the `BookingSearch::sort_column` whitelist.
    async fn search(
        &self,
        criteria: &BookingSearch,
        page: &PageRequest,
        sort_column: &str,
    ) -> Result<Page<Booking>, RepositoryError>;

    /// Atomic PENDING -> APPROVED transition. Returns false when the row was
    /// no longer PENDING, which is how a losing racer learns it lost.
    async fn mark_approved(
        &self,
        id: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Atomic PENDING -> REJECTED transition stamping the cancellation fields.
    async fn mark_rejected(
        &self,
        id: &BookingId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

pub struct SqlBookingRepository {
    pool: DbPool,
}

impl SqlBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "\
    id, name, image_url, description, region, country, \
    check_in_date, check_out_date, number_of_nights, number_of_guests, \
    number_of_rooms, max_guests, price_per_night, subtotal, tax_amount, \
    discount_amount, total_amount, payment_reference, payment_method, is_paid, \
    payment_date, status, is_cancelled, cancelled_at, cancellation_reason, \
    user_id, created_at, updated_at";

#[async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| booking_from_row(&value)).transpose()
    }

    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, name, image_url, description, region, country,
                check_in_date, check_out_date, number_of_nights, number_of_guests,
                number_of_rooms, max_guests, price_per_night, subtotal, tax_amount,
                discount_amount, total_amount, payment_reference, payment_method, is_paid,
                payment_date, status, is_cancelled, cancelled_at, cancellation_reason,
                user_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(booking.id.to_string())
        .bind(&booking.name)
        .bind(booking.image_url.as_deref())
        .bind(booking.description.as_deref())
        .bind(&booking.region)
        .bind(&booking.country)
        .bind(booking.check_in_date.to_rfc3339())
        .bind(booking.check_out_date.to_rfc3339())
        .bind(booking.number_of_nights)
        .bind(booking.number_of_guests)
        .bind(booking.number_of_rooms)
        .bind(booking.max_guests)
        .bind(booking.price_per_night.to_string())
        .bind(booking.subtotal.to_string())
        .bind(booking.tax_amount.map(|amount| amount.to_string()))
        .bind(booking.discount_amount.map(|amount| amount.to_string()))
        .bind(booking.total_amount.to_string())
        .bind(booking.payment_reference.as_deref())
        .bind(booking.payment_method.as_str())
        .bind(booking.is_paid)
        .bind(booking.payment_date.map(|ts| ts.to_rfc3339()))
        .bind(booking.status.as_str())
        .bind(booking.is_cancelled)
        .bind(booking.cancelled_at.map(|ts| ts.to_rfc3339()))
        .bind(booking.cancellation_reason.as_deref())
        .bind(booking.user_id.to_string())
        .bind(booking.created_at.to_rfc3339())
        .bind(booking.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, booking: &Booking) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE bookings SET
                name = ?, image_url = ?, description = ?, region = ?, country = ?,
                check_in_date = ?, check_out_date = ?, number_of_nights = ?,
                number_of_guests = ?, number_of_rooms = ?, max_guests = ?,
                price_per_night = ?, subtotal = ?, tax_amount = ?, discount_amount = ?,
                total_amount = ?, payment_reference = ?, payment_method = ?, is_paid = ?,
                payment_date = ?, status = ?, is_cancelled = ?, cancelled_at = ?,
                cancellation_reason = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&booking.name)
        .bind(booking.image_url.as_deref())
        .bind(booking.description.as_deref())
        .bind(&booking.region)
        .bind(&booking.country)
        .bind(booking.check_in_date.to_rfc3339())
        .bind(booking.check_out_date.to_rfc3339())
        .bind(booking.number_of_nights)
        .bind(booking.number_of_guests)
        .bind(booking.number_of_rooms)
        .bind(booking.max_guests)
        .bind(booking.price_per_night.to_string())
        .bind(booking.subtotal.to_string())
        .bind(booking.tax_amount.map(|amount| amount.to_string()))
        .bind(booking.discount_amount.map(|amount| amount.to_string()))
        .bind(booking.total_amount.to_string())
        .bind(booking.payment_reference.as_deref())
        .bind(booking.payment_method.as_str())
        .bind(booking.is_paid)
        .bind(booking.payment_date.map(|ts| ts.to_rfc3339()))
        .bind(booking.status.as_str())
        .bind(booking.is_cancelled)
        .bind(booking.cancelled_at.map(|ts| ts.to_rfc3339()))
        .bind(booking.cancellation_reason.as_deref())
        .bind(booking.updated_at.to_rfc3339())
        .bind(booking.id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &BookingId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_by_status(
        &self,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(booking_from_row).collect()
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Booking>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(booking_from_row).collect()
    }

    async fn list_all(&self) -> Result<Vec<Booking>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(booking_from_row).collect()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn search(
        &self,
        criteria: &BookingSearch,
        page: &PageRequest,
        sort_column: &str,
    ) -> Result<Page<Booking>, RepositoryError> {
        let mut count_builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM bookings WHERE 1=1");
        push_filters(&mut count_builder, criteria);
        let total: i64 = count_builder.build_query_scalar().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE 1=1"));
        push_filters(&mut builder, criteria);
        builder.push(format!(
            " ORDER BY {} {}, id DESC",
            order_expr(sort_column),
            page.direction.as_sql()
        ));
        builder.push(" LIMIT ").push_bind(i64::from(page.size.max(1)));
        builder.push(" OFFSET ").push_bind(i64::from(page.offset()));

        let rows = builder.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(booking_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, page, total as u64))
    }

    async fn mark_approved(
        &self,
        id: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'APPROVED', updated_at = ?
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(now.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_rejected(
        &self,
        id: &BookingId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'REJECTED', is_cancelled = 1,
                 cancelled_at = ?, cancellation_reason = ?, updated_at = ?
             WHERE id = ? AND status = 'PENDING'",
        )
        .bind(now.to_rfc3339())
        .bind(reason)
        .bind(now.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Money columns hold decimal strings, so comparisons and ordering go through
/// CAST to get numeric semantics.
fn order_expr(sort_column: &str) -> String {
    match sort_column {
        "total_amount" | "price_per_night" => format!("CAST({sort_column} AS REAL)"),
        other => other.to_string(),
    }
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, criteria: &'a BookingSearch) {
    if let Some(status) = criteria.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(is_cancelled) = criteria.is_cancelled {
        builder.push(" AND is_cancelled = ").push_bind(is_cancelled);
    }
    if let Some(is_paid) = criteria.is_paid {
        builder.push(" AND is_paid = ").push_bind(is_paid);
    }
    if let Some(method) = criteria.payment_method {
        builder.push(" AND payment_method = ").push_bind(method.as_str());
    }
    if let Some(region) = trimmed(&criteria.region) {
        builder
            .push(" AND lower(region) LIKE ")
            .push_bind(format!("%{}%", region.to_lowercase()));
    }
    if let Some(country) = trimmed(&criteria.country) {
        builder
            .push(" AND lower(country) LIKE ")
            .push_bind(format!("%{}%", country.to_lowercase()));
    }
    if let Some(min_price) = criteria.min_price {
        builder
            .push(" AND CAST(total_amount AS REAL) >= CAST(")
            .push_bind(min_price.to_string())
            .push(" AS REAL)");
    }
    if let Some(max_price) = criteria.max_price {
        builder
            .push(" AND CAST(total_amount AS REAL) <= CAST(")
            .push_bind(max_price.to_string())
            .push(" AS REAL)");
    }
    if let Some(from) = criteria.check_in_from {
        builder.push(" AND check_in_date >= ").push_bind(from.to_rfc3339());
    }
    if let Some(to) = criteria.check_in_to {
        builder.push(" AND check_in_date <= ").push_bind(to.to_rfc3339());
    }
    if let Some(from) = criteria.check_out_from {
        builder.push(" AND check_out_date >= ").push_bind(from.to_rfc3339());
    }
    if let Some(to) = criteria.check_out_to {
        builder.push(" AND check_out_date <= ").push_bind(to.to_rfc3339());
    }
    if let Some(from) = criteria.created_from {
        builder.push(" AND created_at >= ").push_bind(from.to_rfc3339());
    }
    if let Some(to) = criteria.created_to {
        builder.push(" AND created_at <= ").push_bind(to.to_rfc3339());
    }
    if let Some(user_id) = criteria.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.to_string());
    }
    if let Some(reference) = trimmed(&criteria.booking_reference) {
        builder.push(" AND payment_reference = ").push_bind(reference.to_string());
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn booking_from_row(row: &SqliteRow) -> Result<Booking, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = BookingStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("invalid booking status: {status_raw}")))?;

    let method_raw: String = row.try_get("payment_method")?;
    let payment_method = PaymentMethod::parse(&method_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid booking payment_method: {method_raw}"))
    })?;

    Ok(Booking {
        id: BookingId(parse_uuid("booking", &row.try_get::<String, _>("id")?)?),
        name: row.try_get("name")?,
        image_url: row.try_get("image_url")?,
        description: row.try_get("description")?,
        region: row.try_get("region")?,
        country: row.try_get("country")?,
        check_in_date: parse_rfc3339(
            "booking check_in_date",
            &row.try_get::<String, _>("check_in_date")?,
        )?,
        check_out_date: parse_rfc3339(
            "booking check_out_date",
            &row.try_get::<String, _>("check_out_date")?,
        )?,
        number_of_nights: row.try_get("number_of_nights")?,
        number_of_guests: row.try_get("number_of_guests")?,
        number_of_rooms: row.try_get("number_of_rooms")?,
        max_guests: row.try_get("max_guests")?,
        price_per_night: parse_decimal(
            "booking price_per_night",
            &row.try_get::<String, _>("price_per_night")?,
        )?,
        subtotal: parse_decimal("booking subtotal", &row.try_get::<String, _>("subtotal")?)?,
        tax_amount: parse_opt_decimal("booking tax_amount", row.try_get("tax_amount")?)?,
        discount_amount: parse_opt_decimal(
            "booking discount_amount",
            row.try_get("discount_amount")?,
        )?,
        total_amount: parse_decimal(
            "booking total_amount",
            &row.try_get::<String, _>("total_amount")?,
        )?,
        payment_reference: row.try_get("payment_reference")?,
        payment_method,
        is_paid: row.try_get("is_paid")?,
        payment_date: parse_opt_rfc3339("booking payment_date", row.try_get("payment_date")?)?,
        status,
        is_cancelled: row.try_get("is_cancelled")?,
        cancelled_at: parse_opt_rfc3339("booking cancelled_at", row.try_get("cancelled_at")?)?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        user_id: UserId(parse_uuid("booking user", &row.try_get::<String, _>("user_id")?)?),
        created_at: parse_rfc3339("booking created_at", &row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_rfc3339("booking updated_at", &row.try_get::<String, _>("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use stayline_core::chrono::{TimeZone, Utc};
    use stayline_core::domain::booking::{Booking, BookingStatus, NewBooking};
    use stayline_core::domain::user::UserId;
    use stayline_core::rust_decimal::Decimal;
    use stayline_core::search::{BookingSearch, PageRequest, SortDirection};

    use super::{BookingRepository, SqlBookingRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn insert_user(pool: &DbPool) -> UserId {
        let user_id = UserId::new();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, email, display_name, role, created_at)
             VALUES (?, ?, 'Guest', 'USER', ?)",
        )
        .bind(user_id.to_string())
        .bind(format!("{user_id}@stayline.test"))
        .bind(&now)
        .execute(pool)
        .await
        .expect("insert user fixture");
        user_id
    }

    fn booking(user_id: UserId, name: &str, region: &str, price_cents: i64) -> Booking {
        Booking::from_request(
            NewBooking {
                name: name.to_owned(),
                image_url: None,
                description: Some("twin room".to_owned()),
                region: region.to_owned(),
                country: "Cameroon".to_owned(),
                check_in_date: Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap(),
                check_out_date: Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 0).unwrap(),
                number_of_nights: 3,
                number_of_guests: Some(2),
                number_of_rooms: Some(1),
                max_guests: Some(4),
                price_per_night: Decimal::new(price_cents, 2),
                tax_amount: None,
                discount_amount: None,
                payment_method: None,
            },
            user_id,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_then_find_round_trips_every_field() {
        let pool = setup_pool().await;
        let user_id = insert_user(&pool).await;
        let repo = SqlBookingRepository::new(pool.clone());

        let original = booking(user_id, "Sunrise Hostel", "Douala", 5000);
        repo.insert(&original).await.expect("insert booking");

        let fetched = repo
            .find_by_id(&original.id)
            .await
            .expect("find booking")
            .expect("booking exists");
        assert_eq!(fetched, original);

        pool.close().await;
    }

    #[tokio::test]
    async fn mark_approved_only_wins_once() {
        let pool = setup_pool().await;
        let user_id = insert_user(&pool).await;
        let repo = SqlBookingRepository::new(pool.clone());

        let pending = booking(user_id, "Sunrise Hostel", "Douala", 5000);
        repo.insert(&pending).await.expect("insert booking");

        let first = repo.mark_approved(&pending.id, Utc::now()).await.expect("first approve");
        let second = repo.mark_approved(&pending.id, Utc::now()).await.expect("second approve");
        assert!(first, "first transition claims the row");
        assert!(!second, "row is no longer PENDING");

        let reject_after =
            repo.mark_rejected(&pending.id, "late", Utc::now()).await.expect("reject attempt");
        assert!(!reject_after, "approved booking cannot be rejected");

        pool.close().await;
    }

    #[tokio::test]
    async fn mark_rejected_stamps_cancellation_fields() {
        let pool = setup_pool().await;
        let user_id = insert_user(&pool).await;
        let repo = SqlBookingRepository::new(pool.clone());

        let pending = booking(user_id, "Sunrise Hostel", "Douala", 5000);
        repo.insert(&pending).await.expect("insert booking");

        let won = repo
            .mark_rejected(&pending.id, "no rooms left", Utc::now())
            .await
            .expect("reject booking");
        assert!(won);

        let fetched = repo
            .find_by_id(&pending.id)
            .await
            .expect("find booking")
            .expect("booking exists");
        assert_eq!(fetched.status, BookingStatus::Rejected);
        assert!(fetched.is_cancelled);
        assert!(fetched.cancelled_at.is_some());
        assert_eq!(fetched.cancellation_reason.as_deref(), Some("no rooms left"));

        pool.close().await;
    }

    #[tokio::test]
    async fn search_filters_sort_and_paginate() {
        let pool = setup_pool().await;
        let user_id = insert_user(&pool).await;
        let repo = SqlBookingRepository::new(pool.clone());

        repo.insert(&booking(user_id, "Cheap Stay", "Douala", 2000)).await.expect("insert");
        repo.insert(&booking(user_id, "Mid Stay", "Douala", 5000)).await.expect("insert");
        repo.insert(&booking(user_id, "Plush Stay", "Yaounde", 9000)).await.expect("insert");

        let criteria = BookingSearch { region: Some("doua".to_owned()), ..Default::default() };
        let page_request = PageRequest {
            page: 0,
            size: 10,
            sort_by: "totalAmount".to_owned(),
            direction: SortDirection::Asc,
        };
        let page = repo
            .search(&criteria, &page_request, "total_amount")
            .await
            .expect("search bookings");

        assert_eq!(page.total_elements, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "Cheap Stay");
        assert_eq!(page.items[1].name, "Mid Stay");

        let small_page = PageRequest { page: 1, size: 1, ..page_request };
        let second = repo
            .search(&criteria, &small_page, "total_amount")
            .await
            .expect("search second page");
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].name, "Mid Stay");
        assert_eq!(second.total_pages, 2);

        pool.close().await;
    }
}
