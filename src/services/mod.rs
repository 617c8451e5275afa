pub mod user_service;
pub mod workday_service;
