pub mod deck;
pub mod practice_item;
pub mod source_row;

pub use deck::Deck;
pub use practice_item::{
  AnswerType, Cognate, ContentType, ExampleSentence, Language, LetterBreakdown, Linkage,
  MasteryRaw, MemoryAid, Origin, OriginType, PracticeItem, PromptType,
};
pub use source_row::{LessonVocabRow, SavedWordRow, SourceRow};
