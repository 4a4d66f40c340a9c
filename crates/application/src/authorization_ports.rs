mod cache;
mod store;

pub use cache::PermissionSetCache;
pub use store::{PermissionLookup, PermissionStore};
