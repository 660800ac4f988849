pub mod token;

pub use token::{MediaClaims, TokenIssuer, VideoGrant};
