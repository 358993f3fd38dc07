//! Spendbook Web
//!
//! Personal expense tracker built with Leptos (WASM).
//!
//! # Features
//!
//! - Password, magic-link and sign-up login against Supabase
//! - Expense list with add and delete
//! - Dashboard with per-category totals
//! - Collapsible sidebar that folds away on narrow screens
//!
//! # Architecture
//!
//! This is a client-side rendered (CSR) Leptos application that compiles to
//! WebAssembly. All backend traffic goes through the `spendbook` core's
//! session store; this crate only binds its view models to the DOM.
//!
//! The Supabase URL and anon key are read at compile time from
//! `SPENDBOOK_SUPABASE_URL` and `SPENDBOOK_SUPABASE_ANON_KEY`.

use leptos::*;

mod app;
mod components;
mod pages;
mod state;
mod storage;

fn main() {
    // Set up panic hook for better error messages in WASM
    console_error_panic_hook::set_once();

    // Mount the app to the document body
    mount_to_body(|| view! { <app::App /> });
}
