pub mod memory;
pub mod mongo;
pub mod repository_error;
pub mod staff_permission_dao;
pub mod staff_repo;
pub mod user_repo;
