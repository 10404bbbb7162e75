mod token;

pub use token::{mint_token, verify_token, TokenError, TOKEN_TYPE};
