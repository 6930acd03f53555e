use async_trait::async_trait;
use quizcast_shared::{InlineKeyboardMarkup, Update};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    /// Always built through [`TelegramError::http`], which strips the request URL.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Bot API returned no result for {method}")]
    MissingResult { method: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TelegramError {
    /// The request URL carries the bot token, so it never reaches the message.
    fn http(e: reqwest::Error) -> Self {
        TelegramError::Http(e.without_url())
    }

    /// Editing a message with identical content is rejected by the Bot API.
    pub fn is_not_modified(&self) -> bool {
        matches!(self, TelegramError::Api { description, .. } if description.contains("message is not modified"))
    }
}

pub type TelegramResult<T> = std::result::Result<T, TelegramError>;

/// Operations the bot needs from the Telegram Bot API.
#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> TelegramResult<Vec<Update>>;

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> TelegramResult<()>;

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> TelegramResult<()>;

    async fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>) -> TelegramResult<()>;

    async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> TelegramResult<()>;

    async fn get_chat_member_count(&self, chat_id: i64) -> TelegramResult<u64>;
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> TelegramResult<T> {
        if !self.ok {
            return Err(TelegramError::Api {
                code: self.error_code.unwrap_or_default(),
                description: self.description.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        self.result.ok_or_else(|| TelegramError::MissingResult {
            method: method.to_string(),
        })
    }
}

/// Bot API client over HTTPS. The token only lives inside `endpoint`.
pub struct TelegramService {
    client: reqwest::Client,
    endpoint: String,
}

impl TelegramService {
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> TelegramResult<Self> {
        // Long polls hold the connection for `poll_timeout`
        let client = reqwest::Client::builder()
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()
            .map_err(TelegramError::http)?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    async fn call<R>(&self, method: &str, params: Value) -> TelegramResult<R>
    where
        R: DeserializeOwned,
    {
        let response: ApiResponse<R> = self
            .client
            .post(format!("{}/{}", self.endpoint, method))
            .json(&params)
            .send()
            .await
            .map_err(TelegramError::http)?
            .json()
            .await
            .map_err(TelegramError::http)?;

        response.into_result(method)
    }
}

#[async_trait]
impl BotApi for TelegramService {
    async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> TelegramResult<Vec<Update>> {
        let mut params = json!({
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message", "callback_query", "my_chat_member"],
        });
        if let Some(offset) = offset {
            params["offset"] = json!(offset);
        }
        self.call("getUpdates", params).await
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> TelegramResult<()> {
        let mut params = json!({ "chat_id": chat_id, "text": text });
        if let Some(markup) = markup {
            params["reply_markup"] = json!(markup);
        }
        self.call::<Value>("sendMessage", params).await?;
        Ok(())
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> TelegramResult<()> {
        let mut params = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(markup) = markup {
            params["reply_markup"] = json!(markup);
        }
        self.call::<Value>("editMessageText", params).await?;
        Ok(())
    }

    async fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>) -> TelegramResult<()> {
        let mut params = json!({ "callback_query_id": callback_query_id });
        if let Some(text) = text {
            params["text"] = json!(text);
        }
        self.call::<Value>("answerCallbackQuery", params).await?;
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> TelegramResult<()> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "export".to_string());

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name));

        let response: ApiResponse<Value> = self
            .client
            .post(format!("{}/sendDocument", self.endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(TelegramError::http)?
            .json()
            .await
            .map_err(TelegramError::http)?;

        response.into_result("sendDocument")?;
        Ok(())
    }

    async fn get_chat_member_count(&self, chat_id: i64) -> TelegramResult<u64> {
        self.call("getChatMemberCount", json!({ "chat_id": chat_id })).await
    }
}
