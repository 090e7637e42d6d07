//! Collaboration sync layer: a shared CRDT document plus an awareness channel
//! per dashboard session.
//!
//! DESIGN
//! ======
//! Each session owns one [`doc::SharedDoc`] (a Loro document) and one
//! [`awareness::Awareness`] table, both scoped by the session id. Peers meet
//! through a [`transport::Transport`]; [`transport::LocalRelay`] is the
//! in-process implementation used by the demo binary and tests.
//!
//! The shared document mirrors widget layouts only. It is never the source
//! of truth for widget existence, kind, or config; [`bridge::LayoutBridge`]
//! copies layout changes from the store into the document and patches
//! remote layouts back into the store without touching history.
//!
//! ERROR HANDLING
//! ==============
//! Collaboration is optional infrastructure. If a session cannot be joined
//! the host keeps editing locally in single-user mode; see
//! `Workspace::open`.

pub mod awareness;
pub mod bridge;
pub mod doc;
pub mod session;
pub mod transport;

pub use awareness::{Awareness, AwarenessState, UserInfo};
pub use bridge::LayoutBridge;
pub use doc::{ChangeOrigin, MapChange, ObserverId, SharedDoc};
pub use session::{CollabSession, SharedMap};
pub use transport::{Envelope, LocalRelay, SyncMessage, Transport};

/// Peer (client) identifier within a session. Also the Loro peer id.
pub type PeerId = u64;

#[derive(Debug, thiserror::Error)]
pub enum CollabError {
    #[error("collaboration transport unavailable: {0}")]
    Unavailable(String),
    #[error("session {0} is closed")]
    Closed(String),
    #[error("shared document error: {0}")]
    Doc(String),
    #[error("shared value encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}
