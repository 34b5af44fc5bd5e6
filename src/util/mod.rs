pub mod clock;
pub mod crypto_helper;
