//! Pages
//!
//! Top-level page components for each route.

pub mod dashboard;
pub mod expenses;
pub mod login;

pub use dashboard::Dashboard;
pub use expenses::Expenses;
pub use login::Login;
