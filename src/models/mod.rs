pub mod bike;
pub mod user;

pub use bike::{Bike, BikeStatus, BikeView, InconsistentRental, Rental, RentalRequest};
pub use user::{NewUser, User, UserView};
