use crate::telegram_service::{BotApi, TelegramError, TelegramResult};
use async_trait::async_trait;
use quizcast_shared::{InlineKeyboardMarkup, Update};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Message { chat_id: i64, text: String, markup: Option<InlineKeyboardMarkup> },
    Edit { chat_id: i64, message_id: i64, text: String, markup: Option<InlineKeyboardMarkup> },
    Answer { id: String, text: Option<String> },
    Document { chat_id: i64, path: PathBuf, caption: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub chat_id: i64,
    pub text: String,
    pub markup: Option<InlineKeyboardMarkup>,
}

/// In-memory [`BotApi`] that records every call.
///
/// `get_updates` hands out the scripted batches in order, then never returns.
#[derive(Default)]
pub struct RecordingBot {
    calls: Mutex<Vec<Sent>>,
    failing: HashSet<i64>,
    member_count: Option<u64>,
    updates: Mutex<VecDeque<TelegramResult<Vec<Update>>>>,
    offsets: Mutex<Vec<Option<i64>>>,
}

impl RecordingBot {
    pub fn with_updates(self, batches: impl IntoIterator<Item = TelegramResult<Vec<Update>>>) -> Self {
        self.updates.lock().unwrap().extend(batches);
        self
    }

    /// Offsets passed to each `get_updates` call.
    pub fn offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }

    pub fn failing_for(mut self, chat_id: i64) -> Self {
        self.failing.insert(chat_id);
        self
    }

    pub fn with_member_count(mut self, count: u64) -> Self {
        self.member_count = Some(count);
        self
    }

    pub fn calls(&self) -> Vec<Sent> {
        self.calls.lock().unwrap().clone()
    }

    /// New messages and edits, in order.
    pub fn sent(&self) -> Vec<Outgoing> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Sent::Message { chat_id, text, markup } | Sent::Edit { chat_id, text, markup, .. } => {
                    Some(Outgoing { chat_id, text, markup })
                }
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> String {
        self.sent().last().map(|m| m.text.clone()).unwrap_or_default()
    }

    fn record(&self, call: Sent) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, chat_id: i64) -> TelegramResult<()> {
        if self.failing.contains(&chat_id) {
            return Err(TelegramError::Api {
                code: 403,
                description: "Forbidden: bot was kicked from the group chat".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BotApi for RecordingBot {
    async fn get_updates(&self, offset: Option<i64>, _timeout: Duration) -> TelegramResult<Vec<Update>> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.updates.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => std::future::pending().await,
        }
    }

    async fn send_message(&self, chat_id: i64, text: &str, markup: Option<&InlineKeyboardMarkup>) -> TelegramResult<()> {
        self.check(chat_id)?;
        self.record(Sent::Message {
            chat_id,
            text: text.to_string(),
            markup: markup.cloned(),
        });
        Ok(())
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> TelegramResult<()> {
        self.check(chat_id)?;
        self.record(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
            markup: markup.cloned(),
        });
        Ok(())
    }

    async fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>) -> TelegramResult<()> {
        self.record(Sent::Answer {
            id: callback_query_id.to_string(),
            text: text.map(str::to_string),
        });
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> TelegramResult<()> {
        self.check(chat_id)?;
        self.record(Sent::Document {
            chat_id,
            path: path.to_path_buf(),
            caption: caption.to_string(),
        });
        Ok(())
    }

    async fn get_chat_member_count(&self, _chat_id: i64) -> TelegramResult<u64> {
        self.member_count.ok_or(TelegramError::Api {
            code: 400,
            description: "Bad Request: chat not found".to_string(),
        })
    }
}
