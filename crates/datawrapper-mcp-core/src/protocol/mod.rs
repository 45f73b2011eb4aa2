pub mod capabilities;
pub mod constants;
pub mod error;
pub mod message;
pub mod result;
