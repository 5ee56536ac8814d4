pub mod auth;
pub mod calendar;
pub mod certificates;
pub mod clients;
pub mod health;
pub mod horses;
pub mod instructors;
pub mod landing;
pub mod lessons;
pub mod metrics;
pub mod statistics;
pub mod subscriptions;
pub mod users;
