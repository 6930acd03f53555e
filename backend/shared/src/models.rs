use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    /// Id of the admin message the quiz was created from.
    pub id: i64,
    pub text: String,
    pub added_date: DateTime<Utc>,
    #[serde(default)]
    pub sent_count: u64,
    #[serde(default)]
    pub last_sent: Option<DateTime<Utc>>,
    #[serde(default)]
    pub engagement: u64,
}

impl Quiz {
    pub fn new(id: i64, text: impl Into<String>, added_date: DateTime<Utc>) -> Self {
        Self {
            id,
            text: text.into(),
            added_date,
            sent_count: 0,
            last_sent: None,
            engagement: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub chat_id: i64,
    pub title: String,
    pub added_date: DateTime<Utc>,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub quizzes_received: u64,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotStats {
    #[serde(default)]
    pub total_quizzes_sent: u64,
    #[serde(default)]
    pub total_groups_reached: u64,
    #[serde(default)]
    pub quizzes_added: u64,
    pub bot_start_time: DateTime<Utc>,
    #[serde(default)]
    pub last_quiz_sent: Option<DateTime<Utc>>,
    /// Successful deliveries keyed by the group's chat id as a string.
    #[serde(default)]
    pub group_engagement: BTreeMap<String, u64>,
}

impl BotStats {
    pub fn new(bot_start_time: DateTime<Utc>) -> Self {
        Self {
            total_quizzes_sent: 0,
            total_groups_reached: 0,
            quizzes_added: 0,
            bot_start_time,
            last_quiz_sent: None,
            group_engagement: BTreeMap::new(),
        }
    }

    pub fn engagement_total(&self) -> u64 {
        self.group_engagement.values().sum()
    }
}
