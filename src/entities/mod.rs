pub mod prelude;

pub mod courses;
pub mod lessons;
pub mod payments;
pub mod subscriptions;
pub mod user_groups;
pub mod users;
