pub mod config;
pub mod conversation;
pub mod error;
pub mod log;
pub mod models;
pub mod render;
pub mod transport;

pub use config::SqlChatConfig;
pub use conversation::{Conversation, RejectReason, SubmitOutcome};
pub use error::SqlChatError;
pub use models::{ConversationEntry, EntryContent, EntryVariant, RemoteAnswer, Sender, TableRows};
pub use render::{render_entry, Block, Grid, RenderedEntry, TypingIndicator};
pub use transport::{HttpTransport, QueryTransport, TransportError};
