pub mod delivery;
pub mod dispatcher;
pub mod export_service;
pub mod quiz_service;
pub mod render;
pub mod store;
pub mod telegram_service;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use delivery::{BroadcastReport, RoundReport, broadcast, deliver_round};
pub use dispatcher::Dispatcher;
pub use export_service::ExportService;
pub use quiz_service::{QuizEngine, SharedEngine};
pub use store::JsonStore;
pub use telegram_service::{BotApi, TelegramError, TelegramService};
