pub mod error;
pub mod logger;
pub mod rotating_file;
pub mod validation;
