pub mod background_poller;
pub mod sync_service;

pub use background_poller::BackgroundPoller;
pub use sync_service::ChatSyncService;
