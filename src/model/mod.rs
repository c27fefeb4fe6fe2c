pub mod id;
pub mod page;
pub mod permission;
pub mod staff;
pub mod upload_file;
pub mod user;
