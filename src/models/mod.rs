//! Data models for the ArquiAlert backend.
//!
//! Field names serialize in camelCase to match the dashboard's TypeScript interfaces.

mod alert;
mod grant;
mod tender;

pub use alert::*;
pub use grant::*;
pub use tender::*;
