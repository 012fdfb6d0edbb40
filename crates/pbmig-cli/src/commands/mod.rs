pub mod generate;
pub mod inspect;
pub mod revert;
pub mod validate;
