pub mod answer;
pub mod entry;

pub use answer::RemoteAnswer;
pub use entry::{
    ConversationEntry, EntryContent, EntryDraft, EntryId, EntryVariant, Sender, TableRows,
    TableShapeError,
};
