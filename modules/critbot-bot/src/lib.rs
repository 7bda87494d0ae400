pub mod admin;
pub mod dispatch;
pub mod groups;
pub mod health;
pub mod inbox;
pub mod testing;
pub mod transport;

pub use dispatch::{DispatchSettings, Dispatcher};
pub use groups::{GroupStore, MonitoredGroups};
pub use health::{router, shared_status, AppState, AppStatus, SharedStatus};
pub use inbox::{BotEvent, Inbox, InboxSender};
pub use transport::{BridgeTransport, ChatInfo, InboundMessage, Transport};
