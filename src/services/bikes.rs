use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{Bike, BikeView, RentalRequest, User};
use crate::repository::{BikeRepository, RepositoryError, UserRepository};
use crate::request_id::RequestId;

/// Listing, renting and returning bikes.
///
/// Rule checks run in a fixed order so the reported error is deterministic.
/// The final write is a compare-and-set against the state those checks saw.
/// A lost rent is always `BikeRented`; a lost return re-runs the return
/// checks against the bike's latest state.
pub struct BikeService {
    bikes: Arc<dyn BikeRepository>,
    users: Arc<dyn UserRepository>,
}

impl BikeService {
    pub fn new(bikes: Arc<dyn BikeRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { bikes, users }
    }

    /// Every live bike, with renter name and username filled in where the
    /// renter's account can still be found.
    pub async fn list_bikes(&self, rid: &RequestId) -> Result<Vec<BikeView>, AppError> {
        log::info!("[BikeService.list_bikes] {} fetching all bikes", rid);
        let bikes = self
            .bikes
            .list()
            .await
            .map_err(|e| internal(rid, "list_bikes", "fetch all bikes failed", e))?;

        let renter_ids: Vec<i64> = bikes
            .iter()
            .filter_map(Bike::renter)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let renters: HashMap<i64, User> = if renter_ids.is_empty() {
            HashMap::new()
        } else {
            self.users
                .find_by_ids(&renter_ids)
                .await
                .map_err(|e| internal(rid, "list_bikes", "fetch renters failed", e))?
                .into_iter()
                .map(|user| (user.id, user))
                .collect()
        };

        let views = bikes
            .iter()
            .map(|bike| {
                let view = BikeView::from(bike);
                match bike.renter().and_then(|id| renters.get(&id)) {
                    Some(renter) => view.with_renter(renter),
                    None => view,
                }
            })
            .collect::<Vec<_>>();

        log::info!(
            "[BikeService.list_bikes] {} fetched {} bikes",
            rid,
            views.len()
        );
        Ok(views)
    }

    /// Rents `request.bike_id` to `request.user_id`.
    ///
    /// Checks, in order: the user holds no bike, the user exists, the bike
    /// exists, the bike is available.
    pub async fn rent(&self, rid: &RequestId, request: RentalRequest) -> Result<BikeView, AppError> {
        let RentalRequest { bike_id, user_id } = request;
        log::info!(
            "[BikeService.rent] {} user {} is renting bike {}",
            rid,
            user_id,
            bike_id
        );

        let held = self
            .bikes
            .count_by_renter(user_id)
            .await
            .map_err(|e| internal(rid, "rent", "count rentals failed", e))?;
        if held > 0 {
            log::info!(
                "[BikeService.rent] {} user {} is already renting a bike",
                rid,
                user_id
            );
            return Err(AppError::AlreadyRenting);
        }

        let Some(renter) = self
            .users
            .find_by_id(user_id)
            .await
            .map_err(|e| internal(rid, "rent", "fetch user failed", e))?
        else {
            log::info!("[BikeService.rent] {} user {} does not exist", rid, user_id);
            return Err(AppError::UserNotFound);
        };

        let current = self.find_bike(rid, "rent", bike_id).await?;
        let next = current.rental.rent(user_id).map_err(|e| {
            log::info!("[BikeService.rent] {} bike {} is rented", rid, bike_id);
            e
        })?;

        let updated = match self.bikes.swap_rental(bike_id, current.rental, next).await {
            Ok(Some(bike)) => bike,
            Ok(None) => {
                log::warn!(
                    "[BikeService.rent] {} bike {} changed before it could be rented",
                    rid,
                    bike_id
                );
                return Err(AppError::BikeRented);
            }
            Err(RepositoryError::UniqueViolation(_)) => {
                log::warn!(
                    "[BikeService.rent] {} user {} rented another bike concurrently",
                    rid,
                    user_id
                );
                return Err(AppError::AlreadyRenting);
            }
            Err(e) => return Err(internal(rid, "rent", "update bike failed", e)),
        };

        log::info!(
            "[BikeService.rent] {} user {} rent bike {} success",
            rid,
            user_id,
            bike_id
        );
        Ok(BikeView::from(&updated).with_renter(&renter))
    }

    /// Returns `request.bike_id` on behalf of `request.user_id`.
    ///
    /// Checks, in order: the bike exists, the bike is rented, the caller is
    /// the renter. A rejected return leaves the bike untouched.
    pub async fn return_bike(
        &self,
        rid: &RequestId,
        request: RentalRequest,
    ) -> Result<BikeView, AppError> {
        let RentalRequest { bike_id, user_id } = request;
        log::info!(
            "[BikeService.return_bike] {} user {} is returning bike {}",
            rid,
            user_id,
            bike_id
        );

        let current = self.find_bike(rid, "return_bike", bike_id).await?;
        let next = current.rental.release(user_id).map_err(|e| {
            log::info!(
                "[BikeService.return_bike] {} cannot return bike {}: {}",
                rid,
                bike_id,
                e
            );
            e
        })?;

        let updated = match self.bikes.swap_rental(bike_id, current.rental, next).await {
            Ok(Some(bike)) => bike,
            Ok(None) => {
                log::warn!(
                    "[BikeService.return_bike] {} bike {} changed before it could be returned",
                    rid,
                    bike_id
                );
                let latest = self.find_bike(rid, "return_bike", bike_id).await?;
                return Err(match latest.rental.release(user_id) {
                    Err(e) => e,
                    // Handed back to the caller in between; report what this
                    // request found when it tried to write.
                    Ok(_) => AppError::BikeAvailable,
                });
            }
            Err(e) => return Err(internal(rid, "return_bike", "update bike failed", e)),
        };

        log::info!(
            "[BikeService.return_bike] {} user {} return bike {} success",
            rid,
            user_id,
            bike_id
        );
        Ok(BikeView::from(&updated))
    }

    async fn find_bike(&self, rid: &RequestId, op: &str, bike_id: i64) -> Result<Bike, AppError> {
        match self.bikes.find_by_id(bike_id).await {
            Ok(Some(bike)) => Ok(bike),
            Ok(None) => {
                log::info!("[BikeService.{}] {} cannot find bike {}", op, rid, bike_id);
                Err(AppError::BikeNotFound)
            }
            Err(e) => Err(internal(rid, op, "fetch bike failed", e)),
        }
    }
}

fn internal(rid: &RequestId, op: &str, what: &str, error: RepositoryError) -> AppError {
    log::error!("[BikeService.{}] {} {}: {}", op, rid, what, error);
    AppError::from(error)
}
