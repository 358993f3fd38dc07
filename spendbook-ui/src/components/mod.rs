//! UI Components
//!
//! Reusable Leptos components shared by the pages.

pub mod expense_form;
pub mod loading;
pub mod sidebar;
pub mod toast;

pub use expense_form::ExpenseFormFields;
pub use loading::{Loading, LoadingOverlay};
pub use sidebar::Sidebar;
pub use toast::Toast;
