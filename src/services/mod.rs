//! Use-cases. Each service owns the rules for its operations and talks to
//! storage only through the repository traits.

pub mod bikes;
pub mod users;

pub use bikes::BikeService;
pub use users::UserService;
