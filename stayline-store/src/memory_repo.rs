use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use stayline_core::{Booking, BookingRepository, BookingStatus, RepositoryError};
use stayline_shared::RequestContext;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local booking store with the same conditional-write rules as the
/// Postgres repository.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.bookings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bookings.read().await.is_empty()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create(&self, _ctx: &RequestContext, booking: &Booking) -> Result<(), RepositoryError> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id) {
            return Err(RepositoryError::Backend(format!("booking {} already exists", booking.id)));
        }
        if bookings.values().any(|b| b.reference == booking.reference) {
            return Err(RepositoryError::Backend(format!(
                "booking reference {} already exists",
                booking.reference
            )));
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_by_id(&self, _ctx: &RequestContext, id: Uuid) -> Result<Booking, RepositoryError> {
        self.bookings
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn get_by_user_id(
        &self,
        _ctx: &RequestContext,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut owned: Vec<Booking> = bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(owned
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update(&self, _ctx: &RequestContext, booking: &Booking) -> Result<Booking, RepositoryError> {
        let mut bookings = self.bookings.write().await;
        let stored = bookings
            .get_mut(&booking.id)
            .ok_or(RepositoryError::NotFound(booking.id))?;

        if stored.version != booking.version {
            return Err(RepositoryError::Conflict { id: booking.id });
        }

        // Identity, stay, price and creation time are immutable.
        stored.payment_type = booking.payment_type;
        stored.status = booking.status;
        stored.supplier_reference = booking.supplier_reference.clone();
        stored.contact = booking.contact.clone();
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn update_status(
        &self,
        _ctx: &RequestContext,
        id: Uuid,
        expected: BookingStatus,
        status: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        let mut bookings = self.bookings.write().await;
        let stored = bookings.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;

        if stored.status != expected {
            return Err(RepositoryError::Conflict { id });
        }

        stored.status = status;
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use stayline_core::booking::{GuestContact, PaymentType, Stay};
    use stayline_core::supplier::RoomRate;

    fn booking(user_id: &str, reference: &str) -> Booking {
        Booking::new(
            user_id.to_string(),
            reference.to_string(),
            Stay {
                hotel_id: "h1".to_string(),
                room_id: "r1".to_string(),
                check_in: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
                check_out: NaiveDate::from_ymd_opt(2030, 6, 4).unwrap(),
                guests: 2,
            },
            RoomRate { total_price: 300_000, currency: "IDR".to_string() },
            PaymentType::PayNow,
            GuestContact::default(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryBookingRepository::new();
        let ctx = RequestContext::new();
        let b = booking("u1", "SLAAAA");

        repo.create(&ctx, &b).await.unwrap();
        let loaded = repo.get_by_id(&ctx, b.id).await.unwrap();
        assert_eq!(loaded.reference, "SLAAAA");

        let missing = repo.get_by_id(&ctx, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_reference_rejected() {
        let repo = InMemoryBookingRepository::new();
        let ctx = RequestContext::new();
        repo.create(&ctx, &booking("u1", "SLDUP")).await.unwrap();
        assert!(repo.create(&ctx, &booking("u2", "SLDUP")).await.is_err());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_conditional_status_update() {
        let repo = InMemoryBookingRepository::new();
        let ctx = RequestContext::new();
        let b = booking("u1", "SLCOND");
        repo.create(&ctx, &b).await.unwrap();

        let stored = repo
            .update_status(&ctx, b.id, BookingStatus::Init, BookingStatus::AwaitingPayment)
            .await
            .unwrap();
        assert_eq!(stored.status, BookingStatus::AwaitingPayment);
        assert_eq!(stored.version, 1);

        // Second writer still believes the booking is INIT.
        let lost = repo
            .update_status(&ctx, b.id, BookingStatus::Init, BookingStatus::Cancelled)
            .await;
        assert!(matches!(lost, Err(RepositoryError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_stale_version_update_conflicts() {
        let repo = InMemoryBookingRepository::new();
        let ctx = RequestContext::new();
        let b = booking("u1", "SLVER");
        repo.create(&ctx, &b).await.unwrap();

        let mut first = b.clone();
        first.contact.guest_name = Some("Ayu".to_string());
        let stored = repo.update(&ctx, &first).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.contact.guest_name.as_deref(), Some("Ayu"));

        let mut stale = b.clone();
        stale.contact.guest_name = Some("Budi".to_string());
        assert!(matches!(
            repo.update(&ctx, &stale).await,
            Err(RepositoryError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_user_listing_is_paged_newest_first() {
        let repo = InMemoryBookingRepository::new();
        let ctx = RequestContext::new();
        for i in 0..5 {
            let mut b = booking("u1", &format!("SLU{}", i));
            b.created_at = Utc::now() - Duration::minutes(10 - i);
            repo.create(&ctx, &b).await.unwrap();
        }
        repo.create(&ctx, &booking("u2", "SLOTHER")).await.unwrap();

        let page = repo.get_by_user_id(&ctx, "u1", 2, 1).await.unwrap();
        let refs: Vec<&str> = page.iter().map(|b| b.reference.as_str()).collect();
        assert_eq!(refs, vec!["SLU3", "SLU2"]);

        let all = repo.get_by_user_id(&ctx, "u1", 50, 0).await.unwrap();
        assert_eq!(all.len(), 5);
    }
}
