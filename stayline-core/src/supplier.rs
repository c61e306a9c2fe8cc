use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stayline_shared::{DeadlineExceeded, Masked, RequestContext};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::booking::{PaymentType, Stay};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupplierRoom {
    pub room_id: String,
    pub name: String,
    /// Net (pre-markup) price for the whole stay, minor units.
    pub net_price: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    pub rooms: Vec<SupplierRoom>,
}

/// Authoritative gross price for a stay, minor units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomRate {
    pub total_price: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Holder {
    pub name: String,
    pub email: Option<Masked<String>>,
    pub phone: Option<Masked<String>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReservationRequest {
    /// Our booking reference, echoed back by the supplier on its vouchers.
    pub client_reference: String,
    pub holder: Holder,
    pub payment_method: PaymentType,
    pub stay: Stay,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub supplier_reference: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HotelDetails {
    pub hotel_id: String,
    pub name: String,
    /// Star rating, 1-5.
    pub category: u8,
    pub city: String,
    pub address: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SupplierError {
    #[error("supplier unavailable: {0}")]
    Unavailable(String),
    #[error("supplier rejected the request: {0}")]
    Rejected(String),
    #[error("supplier does not know {0}")]
    NotFound(String),
    #[error(transparent)]
    DeadlineExceeded(#[from] DeadlineExceeded),
}

/// The external room-inventory and pricing provider. Source of truth for
/// availability and price.
#[async_trait]
pub trait SupplierClient: Send + Sync {
    async fn get_availability(
        &self,
        ctx: &RequestContext,
        stay: &Stay,
    ) -> Result<Availability, SupplierError>;

    async fn get_room_rate(&self, ctx: &RequestContext, stay: &Stay) -> Result<RoomRate, SupplierError>;

    async fn create_reservation(
        &self,
        ctx: &RequestContext,
        request: &ReservationRequest,
    ) -> Result<Reservation, SupplierError>;

    async fn cancel_reservation(
        &self,
        ctx: &RequestContext,
        supplier_reference: &str,
    ) -> Result<(), SupplierError>;

    async fn get_hotel_details(
        &self,
        ctx: &RequestContext,
        hotel_id: &str,
    ) -> Result<HotelDetails, SupplierError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct SandboxSupplierConfig {
    /// Gross price per night, minor units.
    pub nightly_rate: i64,
    /// Net share of the gross rate, in percent.
    #[serde(default = "default_net_share")]
    pub net_share_percent: i64,
    pub currency: String,
    pub hotel_category: u8,
    #[serde(default)]
    pub sold_out_rooms: Vec<String>,
}

fn default_net_share() -> i64 {
    85
}

/// Deterministic in-process supplier for local runs and demos.
pub struct SandboxSupplierClient {
    config: SandboxSupplierConfig,
    sequence: AtomicU64,
    active: Mutex<HashSet<String>>,
}

impl SandboxSupplierClient {
    pub fn new(config: SandboxSupplierConfig) -> Self {
        Self {
            config,
            sequence: AtomicU64::new(1),
            active: Mutex::new(HashSet::new()),
        }
    }

    fn gross_price(&self, stay: &Stay) -> i64 {
        self.config.nightly_rate * stay.nights().max(1)
    }
}

#[async_trait]
impl SupplierClient for SandboxSupplierClient {
    async fn get_availability(
        &self,
        _ctx: &RequestContext,
        stay: &Stay,
    ) -> Result<Availability, SupplierError> {
        if self.config.sold_out_rooms.contains(&stay.room_id) {
            return Ok(Availability { available: false, rooms: vec![] });
        }

        let gross = self.gross_price(stay);
        Ok(Availability {
            available: true,
            rooms: vec![SupplierRoom {
                room_id: stay.room_id.clone(),
                name: format!("Room {}", stay.room_id),
                net_price: gross * self.config.net_share_percent / 100,
                currency: self.config.currency.clone(),
            }],
        })
    }

    async fn get_room_rate(&self, _ctx: &RequestContext, stay: &Stay) -> Result<RoomRate, SupplierError> {
        if self.config.sold_out_rooms.contains(&stay.room_id) {
            return Err(SupplierError::Rejected(format!("room {} is sold out", stay.room_id)));
        }
        Ok(RoomRate {
            total_price: self.gross_price(stay),
            currency: self.config.currency.clone(),
        })
    }

    async fn create_reservation(
        &self,
        _ctx: &RequestContext,
        request: &ReservationRequest,
    ) -> Result<Reservation, SupplierError> {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let supplier_reference = format!("HB-{}", 100 + seq);
        self.active.lock().await.insert(supplier_reference.clone());

        tracing::info!(
            "Sandbox supplier reserved {} for {} ({} -> {})",
            supplier_reference,
            request.client_reference,
            request.stay.check_in,
            request.stay.check_out
        );

        Ok(Reservation {
            supplier_reference,
            status: "CONFIRMED".to_string(),
        })
    }

    async fn cancel_reservation(
        &self,
        _ctx: &RequestContext,
        supplier_reference: &str,
    ) -> Result<(), SupplierError> {
        if self.active.lock().await.remove(supplier_reference) {
            Ok(())
        } else {
            Err(SupplierError::NotFound(supplier_reference.to_string()))
        }
    }

    async fn get_hotel_details(
        &self,
        _ctx: &RequestContext,
        hotel_id: &str,
    ) -> Result<HotelDetails, SupplierError> {
        Ok(HotelDetails {
            hotel_id: hotel_id.to_string(),
            name: format!("Sandbox Hotel {}", hotel_id),
            category: self.config.hotel_category,
            city: "Jakarta".to_string(),
            address: "Jl. Sandbox 1".to_string(),
        })
    }
}
