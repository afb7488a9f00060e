//! `talkbot-phrase` — first-order word-level Markov chain over archived messages.
//!
//! Every stored message is split on whitespace and the tokens are joined
//! into one sequence. Message boundaries are not marked, so a walk can run
//! from the end of one message into the start of the next.

pub mod chain;
pub mod error;
pub mod generator;

pub use chain::WordChain;
pub use error::PhraseError;
pub use generator::PhraseGenerator;
