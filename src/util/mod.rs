pub mod csv_export;
pub mod error;
pub mod jwt;
pub mod logger;
pub mod multipart;
pub mod password;
pub mod session;
pub mod template;
