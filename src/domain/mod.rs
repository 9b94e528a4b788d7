pub mod commands;
pub mod errors;
pub mod request;
pub mod value_objects;

pub use commands::*;
pub use errors::*;
pub use request::*;
pub use value_objects::*;
