pub mod models;
pub mod telegram;

pub use models::{BotStats, Group, Quiz};
pub use telegram::{
    CallbackQuery, Chat, ChatKind, ChatMember, ChatMemberStatus, ChatMemberUpdated,
    InlineKeyboardButton, InlineKeyboardMarkup, Message, Update, User,
};
