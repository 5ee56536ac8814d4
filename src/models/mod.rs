pub mod auth;
pub mod certificate;
pub mod client;
pub mod horse;
pub mod instructor;
pub mod landing;
pub mod lesson;
pub mod patch;
pub mod statistics;
pub mod subscription;
pub mod user;
