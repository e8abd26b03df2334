pub mod app_config;
pub mod database;
pub mod slot_repo;

pub use database::DbClient;
pub use slot_repo::SqlSlotRepository;
