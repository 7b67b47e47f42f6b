//! Session management
//!
//! Tracks live connections, binds them to user identities, and exports
//! detached views for handler code.

mod registry;
mod session;
mod view;

pub use registry::{SessionEvent, SessionRegistry, SessionRegistryConfig};
pub use session::{Session, SessionState};
pub use view::{ExportedSession, FrontendSessionView};
