pub mod factory;
pub mod token;

pub use factory::build_token_validator;
pub use token::{TokenClaims, TokenError, TokenValidator};
