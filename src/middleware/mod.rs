pub mod permission;

pub use permission::{current_user, require_admin, CurrentUser};
