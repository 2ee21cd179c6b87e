// Error types shared by every component
pub mod error;

// World data model
pub mod model;

// Change notification fan-out
pub mod notify;

// TOML + environment configuration
pub mod config;

// Shared world store
pub mod store;

// Security state machine
pub mod security;

// Seedable randomness for the simulators
pub mod rng;

// Weather and device simulation
pub mod weather;
pub mod device;

// Tasks, monitors and automation scenarios
pub mod scheduler;

// Periodic worker runtime and top-level wiring
pub mod worker;
pub mod home;

// Derived summaries
pub mod analytics;

pub use error::{HubError, HubResult};
pub use home::SmartHome;
