use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::user::User;

/// Represents the rental status of a bike.
/// Corresponds to the `bike_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "bike_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BikeStatus {
    Available,
    Rented,
}

/// The rental state of a bike.
///
/// The `status` / `user_id` column pair is only ever read through
/// [`Rental::from_parts`] and written from [`Rental::status`] and
/// [`Rental::renter`], so a rented bike always has a renter and an available
/// bike never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rental {
    Available,
    Rented(i64),
}

/// A stored status/renter pair that breaks the rental invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("inconsistent rental state: status {status:?} with renter {renter:?}")]
pub struct InconsistentRental {
    pub status: BikeStatus,
    pub renter: Option<i64>,
}

impl Rental {
    pub fn from_parts(status: BikeStatus, renter: Option<i64>) -> Result<Self, InconsistentRental> {
        match (status, renter) {
            (BikeStatus::Available, None) => Ok(Rental::Available),
            (BikeStatus::Rented, Some(user_id)) => Ok(Rental::Rented(user_id)),
            (status, renter) => Err(InconsistentRental { status, renter }),
        }
    }

    pub fn status(&self) -> BikeStatus {
        match self {
            Rental::Available => BikeStatus::Available,
            Rental::Rented(_) => BikeStatus::Rented,
        }
    }

    pub fn renter(&self) -> Option<i64> {
        match self {
            Rental::Available => None,
            Rental::Rented(user_id) => Some(*user_id),
        }
    }

    /// Hands the bike to `user_id`. Fails with `BikeRented` whoever asks.
    pub fn rent(self, user_id: i64) -> Result<Rental, AppError> {
        match self {
            Rental::Available => Ok(Rental::Rented(user_id)),
            Rental::Rented(_) => Err(AppError::BikeRented),
        }
    }

    /// Takes the bike back from `user_id`, who must be the current renter.
    pub fn release(self, user_id: i64) -> Result<Rental, AppError> {
        match self {
            Rental::Available => Err(AppError::BikeAvailable),
            Rental::Rented(renter) if renter != user_id => Err(AppError::BikeNotYours),
            Rental::Rented(_) => Ok(Rental::Available),
        }
    }
}

/// A rentable bike as stored in the `bikes` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Bike {
    pub id: i64,
    pub name: String,
    pub lat: Decimal,
    pub long: Decimal,
    pub rental: Rental,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Bike {
    /// Creates an available bike. Bikes are provisioned out of band; this is
    /// used for seeding stores.
    pub fn new(id: i64, name: impl Into<String>, lat: Decimal, long: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            lat,
            long,
            rental: Rental::Available,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn status(&self) -> BikeStatus {
        self.rental.status()
    }

    pub fn renter(&self) -> Option<i64> {
        self.rental.renter()
    }
}

/// Identifies a rent or return attempt. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalRequest {
    pub bike_id: i64,
    pub user_id: i64,
}

/// A bike as returned by the API, optionally decorated with its renter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeView {
    pub id: i64,
    pub name: String,
    pub lat: String,
    pub long: String,
    pub status: BikeStatus,
    pub user_id: Option<i64>,
    pub name_of_renter: Option<String>,
    pub username_of_renter: Option<String>,
}

impl BikeView {
    pub fn with_renter(mut self, renter: &User) -> Self {
        self.name_of_renter = Some(renter.name.clone());
        self.username_of_renter = Some(renter.username.clone());
        self
    }
}

impl From<&Bike> for BikeView {
    fn from(bike: &Bike) -> Self {
        Self {
            id: bike.id,
            name: bike.name.clone(),
            lat: bike.lat.to_string(),
            long: bike.long.to_string(),
            status: bike.status(),
            user_id: bike.renter(),
            name_of_renter: None,
            username_of_renter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn bike() -> Bike {
        Bike::new(
            1,
            "henry",
            Decimal::from_str("50.119504").unwrap(),
            Decimal::from_str("8.638137").unwrap(),
        )
    }

    #[test]
    fn test_from_parts_accepts_consistent_pairs() {
        assert_eq!(
            Rental::from_parts(BikeStatus::Available, None),
            Ok(Rental::Available)
        );
        assert_eq!(
            Rental::from_parts(BikeStatus::Rented, Some(7)),
            Ok(Rental::Rented(7))
        );
    }

    #[test]
    fn test_from_parts_rejects_inconsistent_pairs() {
        assert!(Rental::from_parts(BikeStatus::Available, Some(7)).is_err());
        assert!(Rental::from_parts(BikeStatus::Rented, None).is_err());
    }

    #[test]
    fn test_status_matches_renter_after_transitions() {
        let rented = Rental::Available.rent(7).unwrap();
        assert_eq!(rented.status(), BikeStatus::Rented);
        assert_eq!(rented.renter(), Some(7));

        let returned = rented.release(7).unwrap();
        assert_eq!(returned.status(), BikeStatus::Available);
        assert_eq!(returned.renter(), None);
    }

    #[test]
    fn test_rent_rented_bike_fails_for_anyone() {
        let rented = Rental::Rented(7);
        assert!(matches!(rented.rent(7), Err(AppError::BikeRented)));
        assert!(matches!(rented.rent(9), Err(AppError::BikeRented)));
    }

    #[test]
    fn test_release_checks_state_then_owner() {
        assert!(matches!(
            Rental::Available.release(7),
            Err(AppError::BikeAvailable)
        ));
        assert!(matches!(
            Rental::Rented(7).release(9),
            Err(AppError::BikeNotYours)
        ));
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let mut bike = bike();
        bike.rental = Rental::Rented(7);
        let json = serde_json::to_value(BikeView::from(&bike)).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "henry");
        assert_eq!(json["lat"], "50.119504");
        assert_eq!(json["long"], "8.638137");
        assert_eq!(json["status"], "rented");
        assert_eq!(json["userId"], 7);
        assert!(json["nameOfRenter"].is_null());
        assert!(json["usernameOfRenter"].is_null());
    }

    #[test]
    fn test_view_of_available_bike_has_no_renter() {
        let json = serde_json::to_value(BikeView::from(&bike())).unwrap();
        assert_eq!(json["status"], "available");
        assert!(json["userId"].is_null());
    }
}
