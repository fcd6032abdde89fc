use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterReq {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthOut {
    pub access_token: String,
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ListingCreate {
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    pub tour_fee_cents: i64,
    #[serde(default)]
    pub max_group_size: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ListingOut {
    pub id: String,
    pub guide_id: String,
    pub title: String,
    pub location: Option<String>,
    pub tour_fee_cents: i64,
    pub max_group_size: i32,
    pub status: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListingsParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BookingCreate {
    pub listing_id: String,
    pub booking_date: String,
    pub num_people: i32,
}

#[derive(Debug, Serialize)]
pub struct BookingOut {
    pub id: String,
    pub listing_id: String,
    pub tourist_id: String,
    pub guide_id: String,
    pub booking_date: String,
    pub num_people: i32,
    pub total_amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookingsParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BookingStatusUpdate {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentInitReq {
    pub booking_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentInitOut {
    pub gateway_url: String,
    pub tran_id: String,
}

// Query params echoed back by the hosted gateway; names are its contract,
// not ours.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(rename = "bookingId")]
    pub booking_id: String,
    #[serde(rename = "tranId")]
    pub tran_id: String,
    #[serde(default)]
    pub sig: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EarningsOut {
    pub guide_id: String,
    pub total_earned_cents: i64,
    pub pending_cents: i64,
    pub completed_count: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub status: &'static str,
    pub env: String,
    pub service: &'static str,
    pub version: &'static str,
}
