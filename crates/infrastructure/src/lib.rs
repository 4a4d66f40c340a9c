//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_object_lister;
mod in_memory_permission_set_cache;
mod in_memory_security_catalog;
mod permission_rows;
mod postgres_audit_repository;
mod postgres_object_lister;
mod postgres_permission_store;
mod postgres_security_admin_repository;

#[cfg(test)]
mod test_database;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_object_lister::InMemoryObjectLister;
pub use in_memory_permission_set_cache::InMemoryPermissionSetCache;
pub use in_memory_security_catalog::InMemorySecurityCatalog;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_object_lister::PostgresObjectLister;
pub use postgres_permission_store::PostgresPermissionStore;
pub use postgres_security_admin_repository::PostgresSecurityAdminRepository;
