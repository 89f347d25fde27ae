/// HTTP middleware: Host header allow-list and token authentication
pub mod allowed_hosts;
pub mod token_auth;

pub use allowed_hosts::AllowedHosts;
pub use token_auth::{CurrentUser, TokenAuth};
