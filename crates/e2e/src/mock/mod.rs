//! In-memory stand-in for the css-adapt page.
//!
//! [`MockApp`] implements [`PageDriver`](crate::driver::PageDriver) over a
//! small element model, so page objects, scenarios and the full suite run
//! under `cargo test` without a browser.

mod app;
mod dom;

pub use app::{MockApp, Theme, THEME_STORAGE_KEY};
pub use dom::{Field, Node, Toast, ToastKind};
