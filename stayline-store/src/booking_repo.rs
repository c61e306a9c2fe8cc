use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use stayline_core::booking::{GuestContact, PaymentType, Stay};
use stayline_core::{Booking, BookingRepository, BookingStatus, RepositoryError};
use stayline_shared::{Masked, RequestContext};
use uuid::Uuid;

const BOOKING_COLUMNS: &str = "id, reference, user_id, hotel_id, room_id, check_in, check_out, guests, \
     total_amount, currency, payment_type, status, supplier_reference, guest_name, guest_email, \
     guest_phone, special_requests, version, created_at, updated_at";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(found.is_some())
    }

    /// A conditional write matched no row: either the booking is gone or
    /// someone else got there first.
    async fn missed_write(&self, id: Uuid) -> RepositoryError {
        match self.exists(id).await {
            Ok(true) => RepositoryError::Conflict { id },
            Ok(false) => RepositoryError::NotFound(id),
            Err(e) => e,
        }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    reference: String,
    user_id: String,
    hotel_id: String,
    room_id: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: i32,
    total_amount: i64,
    currency: String,
    payment_type: String,
    status: String,
    supplier_reference: Option<String>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    special_requests: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status: BookingStatus = row.status.parse().map_err(backend)?;
        let payment_type: PaymentType = row.payment_type.parse().map_err(backend)?;
        let guests = u32::try_from(row.guests)
            .map_err(|_| RepositoryError::Backend(format!("booking {} has {} guests", row.id, row.guests)))?;

        Ok(Booking {
            id: row.id,
            reference: row.reference,
            user_id: row.user_id,
            stay: Stay {
                hotel_id: row.hotel_id,
                room_id: row.room_id,
                check_in: row.check_in,
                check_out: row.check_out,
                guests,
            },
            total_amount: row.total_amount,
            currency: row.currency,
            payment_type,
            status,
            supplier_reference: row.supplier_reference,
            contact: GuestContact {
                guest_name: row.guest_name,
                guest_email: row.guest_email.map(Masked::new),
                guest_phone: row.guest_phone.map(Masked::new),
                special_requests: row.special_requests,
            },
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn backend(err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Backend(err.to_string())
}

fn guests_column(booking: &Booking) -> Result<i32, RepositoryError> {
    i32::try_from(booking.stay.guests).map_err(|_| {
        RepositoryError::Backend(format!("booking {} has {} guests", booking.id, booking.stay.guests))
    })
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create(&self, _ctx: &RequestContext, booking: &Booking) -> Result<(), RepositoryError> {
        let guests = guests_column(booking)?;
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, reference, user_id, hotel_id, room_id, check_in, check_out, guests,
                total_amount, currency, payment_type, status, supplier_reference,
                guest_name, guest_email, guest_phone, special_requests,
                version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.reference)
        .bind(&booking.user_id)
        .bind(&booking.stay.hotel_id)
        .bind(&booking.stay.room_id)
        .bind(booking.stay.check_in)
        .bind(booking.stay.check_out)
        .bind(guests)
        .bind(booking.total_amount)
        .bind(&booking.currency)
        .bind(booking.payment_type.as_str())
        .bind(booking.status.as_str())
        .bind(&booking.supplier_reference)
        .bind(&booking.contact.guest_name)
        .bind(booking.contact.guest_email.as_ref().map(|e| e.expose().clone()))
        .bind(booking.contact.guest_phone.as_ref().map(|p| p.expose().clone()))
        .bind(&booking.contact.special_requests)
        .bind(booking.version)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        tracing::debug!("Inserted booking {} ({})", booking.id, booking.reference);
        Ok(())
    }

    async fn get_by_id(&self, _ctx: &RequestContext, id: Uuid) -> Result<Booking, RepositoryError> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        row.ok_or(RepositoryError::NotFound(id))?.try_into()
    }

    async fn get_by_user_id(
        &self,
        _ctx: &RequestContext,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            BOOKING_COLUMNS
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn update(&self, _ctx: &RequestContext, booking: &Booking) -> Result<Booking, RepositoryError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            r#"
            UPDATE bookings
            SET payment_type = $2, status = $3, supplier_reference = $4,
                guest_name = $5, guest_email = $6, guest_phone = $7, special_requests = $8,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $9
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(booking.id)
        .bind(booking.payment_type.as_str())
        .bind(booking.status.as_str())
        .bind(&booking.supplier_reference)
        .bind(&booking.contact.guest_name)
        .bind(booking.contact.guest_email.as_ref().map(|e| e.expose().clone()))
        .bind(booking.contact.guest_phone.as_ref().map(|p| p.expose().clone()))
        .bind(&booking.contact.special_requests)
        .bind(booking.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.missed_write(booking.id).await),
        }
    }

    async fn update_status(
        &self,
        _ctx: &RequestContext,
        id: Uuid,
        expected: BookingStatus,
        status: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            r#"
            UPDATE bookings
            SET status = $3, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => {
                tracing::debug!("Booking {} status {} -> {}", id, expected, status);
                row.try_into()
            }
            None => Err(self.missed_write(id).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, guests: i32) -> BookingRow {
        let now = Utc::now();
        BookingRow {
            id: Uuid::new_v4(),
            reference: "SLROW".to_string(),
            user_id: "u1".to_string(),
            hotel_id: "h1".to_string(),
            room_id: "r1".to_string(),
            check_in: NaiveDate::from_ymd_opt(2030, 2, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2030, 2, 3).unwrap(),
            guests,
            total_amount: 1_500_000,
            currency: "IDR".to_string(),
            payment_type: "PAY_AT_HOTEL".to_string(),
            status: status.to_string(),
            supplier_reference: Some("HB-123".to_string()),
            guest_name: Some("Ayu".to_string()),
            guest_email: Some("ayu@example.com".to_string()),
            guest_phone: None,
            special_requests: None,
            version: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_guest_count_must_fit_column() {
        let mut booking = Booking::try_from(row("PAID", 2)).unwrap();
        assert_eq!(guests_column(&booking).unwrap(), 2);

        booking.stay.guests = u32::MAX;
        assert!(matches!(guests_column(&booking), Err(RepositoryError::Backend(_))));
    }

    #[test]
    fn test_row_maps_to_booking() {
        let booking = Booking::try_from(row("CONFIRMED", 2)).unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.stay.guests, 2);
        assert_eq!(booking.version, 3);
        assert_eq!(
            booking.contact.guest_email.as_ref().map(|e| e.expose().as_str()),
            Some("ayu@example.com")
        );
    }

    #[test]
    fn test_corrupt_row_is_a_backend_error() {
        assert!(matches!(
            Booking::try_from(row("PENDING", 2)),
            Err(RepositoryError::Backend(_))
        ));
        assert!(matches!(
            Booking::try_from(row("PAID", -1)),
            Err(RepositoryError::Backend(_))
        ));
    }
}
