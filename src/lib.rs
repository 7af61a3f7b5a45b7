pub mod config;
pub mod domains;
pub mod error;
pub mod interfaces;
pub mod providers;
pub mod repository;
pub mod schedule;

pub use crate::config::Config;
pub use crate::error::{MedMinderError, Result};
pub use crate::repository::MedicationRepository;
