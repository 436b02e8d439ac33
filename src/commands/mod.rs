pub mod compose;
pub mod import;
pub mod status;
pub mod transform;
pub mod validate;
