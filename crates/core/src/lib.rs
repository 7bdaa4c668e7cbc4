// crates/core/src/lib.rs
pub mod error;
pub mod member;
pub mod validate;

pub use error::*;
pub use member::*;
pub use validate::*;
