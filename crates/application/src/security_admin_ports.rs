mod repositories;
mod roles;

pub use repositories::SecurityAdminRepository;
pub use roles::{
    CreatePermissionGroupInput, CreateRoleInput, RoleAssignment, RoleGrants, UpdateRoleInput,
};
