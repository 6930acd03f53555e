use crate::store::JsonStore;
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use quizcast_shared::{BotStats, Group, Quiz};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const QUIZZES_FILE: &str = "quizzes.json";
pub const GROUPS_FILE: &str = "groups.json";
pub const STATS_FILE: &str = "bot_stats.json";

/// Window in which a group counts as active on the statistics view.
pub const ACTIVE_WINDOW_DAYS: i64 = 7;

pub type SharedEngine = Arc<Mutex<QuizEngine>>;

/// A group a quiz or announcement is addressed to.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub chat_id: i64,
    pub title: String,
}

/// The quiz picked for one scheduled round and the groups it goes to.
#[derive(Debug, Clone)]
pub struct QuizRound {
    pub quiz_id: i64,
    pub text: String,
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub total_quizzes: usize,
    pub quizzes_added: u64,
    pub most_sent: u64,
    pub total_groups: usize,
    pub active_groups: usize,
    pub total_quizzes_sent: u64,
    pub bot_start_time: DateTime<Utc>,
    pub last_quiz_sent: Option<DateTime<Utc>>,
    pub engagement_total: u64,
}

impl StatsSummary {
    pub fn avg_quizzes_per_group(&self) -> f64 {
        if self.total_groups == 0 {
            0.0
        } else {
            self.total_quizzes_sent as f64 / self.total_groups as f64
        }
    }
}

/// Quizzes, registered groups and statistics, persisted in a [`JsonStore`].
pub struct QuizEngine {
    store: JsonStore,
    quizzes: Vec<Quiz>,
    groups: Vec<Group>,
    stats: BotStats,
    broadcast_mode: HashSet<i64>,
}

impl QuizEngine {
    pub fn load(store: JsonStore) -> Self {
        let quizzes: Vec<Quiz> = store.load_or(QUIZZES_FILE, Vec::new());
        let groups: Vec<Group> = store.load_or(GROUPS_FILE, Vec::new());
        let stats = store.load_or(STATS_FILE, BotStats::new(Utc::now()));

        log::info!(
            "Loaded {} quizzes and {} groups from {}",
            quizzes.len(),
            groups.len(),
            store.base_path().display()
        );

        Self {
            store,
            quizzes,
            groups,
            stats,
            broadcast_mode: HashSet::new(),
        }
    }

    pub fn shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn stats(&self) -> &BotStats {
        &self.stats
    }

    pub fn group(&self, chat_id: i64) -> Option<&Group> {
        self.groups.iter().find(|g| g.chat_id == chat_id)
    }

    pub fn targets(&self) -> Vec<Target> {
        self.groups
            .iter()
            .map(|g| Target {
                chat_id: g.chat_id,
                title: g.title.clone(),
            })
            .collect()
    }

    /// Registers a group, or refreshes it in place when already known.
    /// Returns `true` for a group seen for the first time.
    pub fn register_group(&mut self, chat_id: i64, title: &str, member_count: u64) -> Result<bool> {
        let now = Utc::now();
        let group = Group {
            chat_id,
            title: title.to_string(),
            added_date: now,
            member_count,
            quizzes_received: 0,
            last_activity: now,
        };

        let is_new = match self.groups.iter_mut().find(|g| g.chat_id == chat_id) {
            Some(existing) => {
                *existing = group;
                false
            }
            None => {
                self.groups.push(group);
                true
            }
        };

        self.store.save(GROUPS_FILE, &self.groups)?;
        log::info!("Registered group {} ({}), new: {}", chat_id, title, is_new);
        Ok(is_new)
    }

    pub fn add_quiz(&mut self, message_id: i64, text: &str) -> Result<Quiz> {
        let quiz = Quiz::new(message_id, text, Utc::now());
        self.quizzes.push(quiz.clone());
        self.stats.quizzes_added += 1;

        self.store.save(QUIZZES_FILE, &self.quizzes)?;
        self.store.save(STATS_FILE, &self.stats)?;
        log::info!("Saved quiz {}, total quizzes: {}", quiz.id, self.quizzes.len());
        Ok(quiz)
    }

    pub fn remove_group(&mut self, chat_id: i64) -> Result<bool> {
        let before = self.groups.len();
        self.groups.retain(|g| g.chat_id != chat_id);
        let removed = self.groups.len() != before;

        if removed {
            self.store.save(GROUPS_FILE, &self.groups)?;
            log::info!("Removed group {}", chat_id);
        }
        Ok(removed)
    }

    /// Drops groups that never received a quiz. Returns how many were removed.
    pub fn clean_inactive_groups(&mut self) -> Result<usize> {
        let before = self.groups.len();
        self.groups.retain(|g| g.quizzes_received > 0);
        let removed = before - self.groups.len();

        if removed > 0 {
            self.store.save(GROUPS_FILE, &self.groups)?;
            log::info!("Cleaned {} inactive groups", removed);
        }
        Ok(removed)
    }

    pub fn plan_round(&mut self) -> Result<Option<QuizRound>> {
        self.plan_round_with(&mut rand::thread_rng())
    }

    /// Picks a quiz for the next round and books it as sent to every group.
    /// The counters only change once both files are saved.
    pub fn plan_round_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<QuizRound>> {
        if self.groups.is_empty() {
            return Ok(None);
        }
        let now = Utc::now();
        let mut quizzes = self.quizzes.clone();
        let Some(quiz) = quizzes.choose_mut(rng) else {
            return Ok(None);
        };

        quiz.sent_count += 1;
        quiz.last_sent = Some(now);
        let (quiz_id, text) = (quiz.id, quiz.text.clone());

        let mut stats = self.stats.clone();
        stats.total_quizzes_sent += self.groups.len() as u64;
        stats.last_quiz_sent = Some(now);
        self.store.save(QUIZZES_FILE, &quizzes)?;
        self.store.save(STATS_FILE, &stats)?;
        self.quizzes = quizzes;
        self.stats = stats;

        Ok(Some(QuizRound {
            quiz_id,
            text,
            targets: self.targets(),
        }))
    }

    /// Books one successful delivery. Groups removed mid-round are ignored.
    pub fn record_delivery(&mut self, chat_id: i64) -> bool {
        let Some(group) = self.groups.iter_mut().find(|g| g.chat_id == chat_id) else {
            return false;
        };
        group.quizzes_received += 1;
        group.last_activity = Utc::now();

        *self
            .stats
            .group_engagement
            .entry(chat_id.to_string())
            .or_insert(0) += 1;
        true
    }

    /// Writes every document; called once a round has been delivered.
    pub fn persist(&self) -> Result<()> {
        self.store.save(QUIZZES_FILE, &self.quizzes)?;
        self.store.save(STATS_FILE, &self.stats)?;
        self.store.save(GROUPS_FILE, &self.groups)?;
        Ok(())
    }

    pub fn enter_broadcast(&mut self, user_id: i64) {
        self.broadcast_mode.insert(user_id);
    }

    pub fn leave_broadcast(&mut self, user_id: i64) {
        self.broadcast_mode.remove(&user_id);
    }

    pub fn in_broadcast(&self, user_id: i64) -> bool {
        self.broadcast_mode.contains(&user_id)
    }

    /// Leaves broadcast mode, returning whether the user was in it.
    pub fn take_broadcast(&mut self, user_id: i64) -> bool {
        self.broadcast_mode.remove(&user_id)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> StatsSummary {
        let active_since = now - ChronoDuration::days(ACTIVE_WINDOW_DAYS);

        StatsSummary {
            total_quizzes: self.quizzes.len(),
            quizzes_added: self.stats.quizzes_added,
            most_sent: self.quizzes.iter().map(|q| q.sent_count).max().unwrap_or(0),
            total_groups: self.groups.len(),
            active_groups: self
                .groups
                .iter()
                .filter(|g| g.last_activity > active_since)
                .count(),
            total_quizzes_sent: self.stats.total_quizzes_sent,
            bot_start_time: self.stats.bot_start_time,
            last_quiz_sent: self.stats.last_quiz_sent,
            engagement_total: self.stats.engagement_total(),
        }
    }

    /// Groups that received at least one quiz.
    pub fn delivering_groups(&self) -> usize {
        self.groups.iter().filter(|g| g.quizzes_received > 0).count()
    }

    /// Most served groups first; ties keep registration order.
    pub fn top_groups(&self, limit: usize) -> Vec<Group> {
        let mut sorted = self.groups.clone();
        sorted.sort_by(|a, b| b.quizzes_received.cmp(&a.quizzes_received));
        sorted.truncate(limit);
        sorted
    }
}
