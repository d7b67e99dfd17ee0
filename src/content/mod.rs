//! Text processing over practice content.
//!
//! - **Tokenizer**: lossless word/punctuation/whitespace split per language
//! - **Adapters**: source rows (lesson vocab, saved words) to `PracticeItem`
//! - **Cognates**: Hebrew cognate lookup and display gating for Arabic items

pub mod adapters;
pub mod cognates;
pub mod tokenizer;

pub use adapters::normalize;
pub use cognates::{CognateLookup, CognatePrefs, StaticCognates};
pub use tokenizer::{tokenize, words, Token, TokenKind};
