//! Conversation controller
//!
//! Owns the session state of one linear conversation and runs the request
//! cycle behind `submit`:
//! 1. append the user's question and mark the session as awaiting a response
//! 2. ask the transport
//! 3. decompose the answer into SQL, explanation and table entries, or append
//!    a single error entry
//! 4. release the awaiting flag
//!
//! Step 4 is tied to an `InFlightGuard`, so the flag is cleared on every exit
//! path, including a panicking transport or a dropped `submit` future.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::config::SqlChatConfig;
use crate::error::SqlChatError;
use crate::log::MessageLog;
use crate::models::{ConversationEntry, EntryContent, EntryDraft, RemoteAnswer};
use crate::transport::{HttpTransport, QueryTransport, TransportError};

pub const SQL_LABEL: &str = "Here's the SQL query for your question:";
pub const EXPLANATION_LABEL: &str = "Explanation:";
pub const RESULTS_LABEL: &str = "Query Results:";
pub const NO_RESULTS_LABEL: &str = "No data returned from query.";
pub const GENERIC_ERROR_DETAIL: &str = "Failed to process request";

// ============================================================================
// Session state
// ============================================================================

#[derive(Debug)]
struct SessionState {
    log: MessageLog,
    awaiting_response: bool,
    pending_input: String,
}

/// Why `submit` ignored a question. Not an error: no entry is appended and
/// nothing is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyInput,
    RequestInFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(RejectReason),
    /// The answer was decomposed into three entries.
    Answered,
    /// A single error entry with this text was appended.
    Failed { message: String },
}

/// Clears the awaiting flag when dropped.
struct InFlightGuard<'a> {
    state: &'a Mutex<SessionState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .awaiting_response = false;
    }
}

// ============================================================================
// Answer decomposition
// ============================================================================

/// Split one answer into its SQL, explanation and table entries, in that order.
pub fn decompose_answer(answer: RemoteAnswer) -> [EntryDraft; 3] {
    let table_label = if answer.result_rows.is_empty() {
        NO_RESULTS_LABEL
    } else {
        RESULTS_LABEL
    };

    [
        EntryDraft::assistant_with(
            SQL_LABEL,
            EntryContent::Sql {
                sql: answer.sql_query,
            },
        ),
        EntryDraft::assistant_with(
            EXPLANATION_LABEL,
            EntryContent::Explanation {
                explanation: answer.explanation,
            },
        ),
        EntryDraft::assistant_with(
            table_label,
            EntryContent::Table {
                rows: answer.result_rows,
                columns: answer.columns,
            },
        ),
    ]
}

/// Text of the entry shown when a request fails.
pub fn error_entry_text(err: &TransportError) -> String {
    let detail = err
        .detail()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| GENERIC_ERROR_DETAIL.to_string());
    format!("Error: {detail}")
}

// ============================================================================
// Conversation
// ============================================================================

/// One user's conversation with the query service.
pub struct Conversation {
    id: Uuid,
    transport: Arc<dyn QueryTransport>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("id", &self.id)
            .field("transport", &self.transport.name())
            .finish_non_exhaustive()
    }
}

impl Conversation {
    /// Start a session seeded with the assistant's greeting.
    pub fn new(transport: Arc<dyn QueryTransport>, greeting: &str) -> Self {
        let mut log = MessageLog::new();
        log.append(EntryDraft::assistant(greeting));

        let id = Uuid::new_v4();
        tracing::debug!(session_id = %id, transport = transport.name(), "Conversation started");

        Self {
            id,
            transport,
            state: Mutex::new(SessionState {
                log,
                awaiting_response: false,
                pending_input: String::new(),
            }),
        }
    }

    /// Start a session that talks to the configured HTTP query service.
    pub fn over_http(config: &SqlChatConfig) -> Result<Self, SqlChatError> {
        let transport = HttpTransport::new(&config.service)?;
        Ok(Self::new(Arc::new(transport), &config.chat.greeting))
    }

    pub fn session_id(&self) -> Uuid {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Vec<ConversationEntry> {
        self.lock().log.snapshot()
    }

    /// Entries appended after the first `seen` ones.
    pub fn entries_since(&self, seen: usize) -> Vec<ConversationEntry> {
        self.lock().log.since(seen)
    }

    pub fn len(&self) -> usize {
        self.lock().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().log.is_empty()
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.lock().awaiting_response
    }

    pub fn pending_input(&self) -> String {
        self.lock().pending_input.clone()
    }

    pub fn set_pending_input(&self, text: impl Into<String>) {
        self.lock().pending_input = text.into();
    }

    /// Ask a question. Empty questions and questions sent while another
    /// request is in flight are ignored.
    pub async fn submit(&self, question: &str) -> SubmitOutcome {
        let guard = match self.begin(question) {
            Ok(guard) => guard,
            Err(reason) => {
                tracing::debug!(session_id = %self.id, reason = ?reason, "Submission ignored");
                return SubmitOutcome::Rejected(reason);
            }
        };

        let result = self.transport.ask_question(question).await;

        let outcome = {
            let mut state = self.lock();
            match result {
                Ok(answer) => {
                    tracing::info!(
                        session_id = %self.id,
                        rows = answer.result_rows.len(),
                        "Answer received"
                    );
                    for draft in decompose_answer(answer) {
                        state.log.append(draft);
                    }
                    SubmitOutcome::Answered
                }
                Err(e) => {
                    tracing::warn!(session_id = %self.id, error = %e, "Question failed");
                    let message = error_entry_text(&e);
                    state.log.append(EntryDraft::assistant(message.clone()));
                    SubmitOutcome::Failed { message }
                }
            }
        };

        drop(guard);
        outcome
    }

    /// Accept a question: append it, clear the input and raise the flag.
    fn begin(&self, question: &str) -> Result<InFlightGuard<'_>, RejectReason> {
        if question.trim().is_empty() {
            return Err(RejectReason::EmptyInput);
        }

        let mut state = self.lock();
        if state.awaiting_response {
            return Err(RejectReason::RequestInFlight);
        }

        let entry = state.log.append(EntryDraft::user(question));
        state.pending_input.clear();
        state.awaiting_response = true;

        tracing::info!(session_id = %self.id, entry_id = %entry.id(), "Question submitted");

        Ok(InFlightGuard { state: &self.state })
    }
}

// ============================================================================
// TESTS
// ============================================================================
