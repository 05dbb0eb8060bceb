pub mod claims;
pub(crate) mod common;
pub mod reference;
