//! Transaction construction for rune mints: the runestone payload
//! encoder and a taproot key-spend builder/signer.

pub mod runestone;
pub mod tx;

pub use runestone::OrdinalsEncoder;
pub use tx::KeySpendBuilder;
