use crate::delivery;
use crate::export_service::ExportService;
use crate::quiz_service::SharedEngine;
use crate::render::{self, data};
use crate::telegram_service::BotApi;
use anyhow::Result;
use chrono::Utc;
use quizcast_shared::{CallbackQuery, ChatKind, ChatMemberUpdated, InlineKeyboardMarkup, Message, Update, User};
use std::sync::Arc;
use std::time::Duration;

const TOP_GROUPS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stats,
    Broadcast,
    Export,
    Groups,
}

impl Command {
    /// Parses the leading `/command` of a message, dropping any `@botname` suffix.
    /// `None` for plain text; `Some(None)` for commands the bot does not know.
    pub fn parse(text: &str) -> Option<Option<Command>> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);

        Some(match name {
            "start" => Some(Command::Start),
            "stats" => Some(Command::Stats),
            "broadcast" => Some(Command::Broadcast),
            "export" => Some(Command::Export),
            "groups" => Some(Command::Groups),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Stats,
    AddQuiz,
    Broadcast,
    ManageGroups,
    ExportData,
    CancelBroadcast,
    CleanInactive,
    RemoveGroup(i64),
    GroupStats(i64),
}

impl CallbackAction {
    pub fn parse(raw: &str) -> Option<Self> {
        let action = match raw {
            data::STATS => CallbackAction::Stats,
            data::ADD_QUIZ => CallbackAction::AddQuiz,
            data::BROADCAST => CallbackAction::Broadcast,
            data::MANAGE_GROUPS => CallbackAction::ManageGroups,
            data::EXPORT_DATA => CallbackAction::ExportData,
            data::CANCEL_BROADCAST => CallbackAction::CancelBroadcast,
            data::CLEAN_INACTIVE => CallbackAction::CleanInactive,
            _ => {
                if let Some(id) = raw.strip_prefix(data::REMOVE_GROUP_PREFIX) {
                    CallbackAction::RemoveGroup(id.parse().ok()?)
                } else if let Some(id) = raw.strip_prefix(data::GROUP_STATS_PREFIX) {
                    CallbackAction::GroupStats(id.parse().ok()?)
                } else {
                    return None;
                }
            }
        };
        Some(action)
    }
}

/// Where a view is shown: a fresh message for commands, an edit for buttons.
#[derive(Debug, Clone, Copy)]
enum Reply {
    New { chat_id: i64 },
    Edit { chat_id: i64, message_id: i64 },
}

/// Routes incoming updates to the quiz engine and answers through the Bot API.
#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<dyn BotApi>,
    engine: SharedEngine,
    admin_id: i64,
    send_delay: Duration,
    quiz_interval: Duration,
}

impl Dispatcher {
    pub fn new(
        api: Arc<dyn BotApi>,
        engine: SharedEngine,
        admin_id: i64,
        send_delay: Duration,
        quiz_interval: Duration,
    ) -> Self {
        Self {
            api,
            engine,
            admin_id,
            send_delay,
            quiz_interval,
        }
    }

    fn is_admin(&self, user: &User) -> bool {
        user.id == self.admin_id
    }

    pub async fn dispatch(&self, update: Update) -> Result<()> {
        if let Some(query) = update.callback_query {
            return self.handle_callback(query).await;
        }
        if let Some(member) = update.my_chat_member {
            return self.handle_membership(member).await;
        }
        if let Some(message) = update.message {
            return self.handle_message(message).await;
        }
        Ok(())
    }

    async fn respond(&self, reply: Reply, text: &str, markup: Option<&InlineKeyboardMarkup>) -> Result<()> {
        let result = match reply {
            Reply::New { chat_id } => self.api.send_message(chat_id, text, markup).await,
            Reply::Edit { chat_id, message_id } => {
                self.api.edit_message_text(chat_id, message_id, text, markup).await
            }
        };

        match result {
            Err(e) if e.is_not_modified() => Ok(()),
            other => Ok(other?),
        }
    }

    async fn handle_message(&self, message: Message) -> Result<()> {
        let (Some(text), Some(user)) = (message.text.as_deref(), message.from.as_ref()) else {
            return Ok(());
        };
        let reply = Reply::New { chat_id: message.chat.id };
        let private = message.chat.kind == ChatKind::Private;

        match Command::parse(text) {
            Some(Some(Command::Start)) if private => {
                if self.is_admin(user) {
                    let (text, keyboard) = render::admin_dashboard();
                    self.respond(reply, &text, Some(&keyboard)).await
                } else {
                    self.respond(reply, &render::public_intro(self.quiz_interval), None).await
                }
            }
            Some(Some(Command::Start)) => self.add_to_group(&message, user).await,
            Some(Some(_)) if !self.is_admin(user) => self.respond(reply, render::ADMIN_ONLY, None).await,
            Some(Some(Command::Stats)) => self.show_stats(reply).await,
            Some(Some(Command::Broadcast)) => self.start_broadcast(reply, user).await,
            Some(Some(Command::Export)) => self.export_data(reply, user).await,
            Some(Some(Command::Groups)) => self.manage_groups(reply).await,
            Some(None) => Ok(()),
            None if private => self.handle_private_text(&message, user, text).await,
            None => Ok(()),
        }
    }

    async fn add_to_group(&self, message: &Message, user: &User) -> Result<()> {
        let chat = &message.chat;
        let title = chat.title.clone().unwrap_or_default();
        let member_count = match self.api.get_chat_member_count(chat.id).await {
            Ok(count) => count,
            Err(e) => {
                log::warn!("Failed to get member count for {}: {}", chat.id, e);
                0
            }
        };

        let is_new = self.engine.lock().await.register_group(chat.id, &title, member_count)?;

        let text = render::group_welcome(&title, is_new, self.quiz_interval);
        let reply = Reply::New { chat_id: chat.id };
        if self.is_admin(user) {
            self.respond(reply, &text, Some(&render::group_admin_keyboard(chat.id))).await
        } else {
            self.respond(reply, &text, None).await
        }
    }

    async fn handle_private_text(&self, message: &Message, user: &User, text: &str) -> Result<()> {
        let reply = Reply::New { chat_id: message.chat.id };
        if !self.is_admin(user) {
            return self.respond(reply, render::ADMIN_ONLY_PRIVATE, None).await;
        }

        let broadcasting = self.engine.lock().await.take_broadcast(user.id);
        if broadcasting {
            let report = delivery::broadcast(self.api.as_ref(), &self.engine, text, self.send_delay).await;
            let summary = render::broadcast_report(report.sent, report.total, &report.failed);
            return self.respond(reply, &summary, None).await;
        }

        let confirmation = {
            let mut engine = self.engine.lock().await;
            engine.add_quiz(message.message_id, text)?;
            render::quiz_saved(engine.quizzes().len(), engine.groups().len(), text)
        };
        self.respond(reply, &confirmation, None).await
    }

    async fn handle_membership(&self, update: ChatMemberUpdated) -> Result<()> {
        if update.new_chat_member.status.is_gone() {
            let removed = self.engine.lock().await.remove_group(update.chat.id)?;
            if removed {
                log::info!("Bot left group {}, stopped sending quizzes there", update.chat.id);
            }
        }
        Ok(())
    }

    async fn handle_callback(&self, query: CallbackQuery) -> Result<()> {
        let action = query.data.as_deref().and_then(CallbackAction::parse);
        let reply = match &query.message {
            Some(message) => Reply::Edit {
                chat_id: message.chat.id,
                message_id: message.message_id,
            },
            None => Reply::New { chat_id: query.from.id },
        };

        match action {
            None => {
                self.answer(&query.id, None).await;
                Ok(())
            }
            Some(_) if !self.is_admin(&query.from) => {
                self.answer(&query.id, Some(render::ADMIN_ONLY)).await;
                Ok(())
            }
            Some(action) => self.run_action(action, reply, &query.from, &query.id).await,
        }
    }

    /// Stops the client's spinner. A failed answer is logged, never fatal.
    async fn answer(&self, query_id: &str, notice: Option<&str>) {
        if let Err(e) = self.api.answer_callback_query(query_id, notice).await {
            log::warn!("Failed to answer callback query {}: {}", query_id, e);
        }
    }

    /// Runs a button action. The query is answered before any Bot API work;
    /// the two notice actions only touch the engine before they answer.
    async fn run_action(&self, action: CallbackAction, reply: Reply, user: &User, query_id: &str) -> Result<()> {
        match action {
            CallbackAction::CleanInactive => {
                let cleaned = {
                    let mut engine = self.engine.lock().await;
                    engine.clean_inactive_groups().map(|removed| (removed, engine.groups().len()))
                };
                let (removed, remaining) = match cleaned {
                    Ok((0, _)) => {
                        self.answer(query_id, Some(render::NO_INACTIVE_GROUPS)).await;
                        return Ok(());
                    }
                    Ok(counts) => counts,
                    Err(e) => {
                        self.answer(query_id, None).await;
                        return Err(e);
                    }
                };
                self.answer(query_id, None).await;
                self.respond(reply, &render::cleaned_groups(removed, remaining), None).await
            }
            CallbackAction::GroupStats(chat_id) => {
                let view = self.engine.lock().await.group(chat_id).map(render::group_stats);
                let Some((text, keyboard)) = view else {
                    self.answer(query_id, Some(render::GROUP_NOT_FOUND)).await;
                    return Ok(());
                };
                self.answer(query_id, None).await;
                self.respond(reply, &text, Some(&keyboard)).await
            }
            action => {
                self.answer(query_id, None).await;
                match action {
                    CallbackAction::Stats => self.show_stats(reply).await,
                    CallbackAction::AddQuiz => self.respond(reply, &render::add_quiz_help(), None).await,
                    CallbackAction::Broadcast => self.start_broadcast(reply, user).await,
                    CallbackAction::ManageGroups => self.manage_groups(reply).await,
                    CallbackAction::ExportData => self.export_data(reply, user).await,
                    CallbackAction::CancelBroadcast => {
                        self.engine.lock().await.leave_broadcast(user.id);
                        self.respond(reply, render::BROADCAST_CANCELLED, None).await
                    }
                    CallbackAction::RemoveGroup(chat_id) => {
                        self.engine.lock().await.remove_group(chat_id)?;
                        self.respond(reply, render::GROUP_REMOVED, None).await
                    }
                    CallbackAction::CleanInactive | CallbackAction::GroupStats(_) => Ok(()),
                }
            }
        }
    }

    async fn show_stats(&self, reply: Reply) -> Result<()> {
        let summary = self.engine.lock().await.summary(Utc::now());
        let (text, keyboard) = render::stats_view(&summary, self.quiz_interval);
        self.respond(reply, &text, Some(&keyboard)).await
    }

    async fn start_broadcast(&self, reply: Reply, user: &User) -> Result<()> {
        let total_groups = {
            let mut engine = self.engine.lock().await;
            engine.enter_broadcast(user.id);
            engine.groups().len()
        };
        let (text, keyboard) = render::broadcast_prompt(total_groups);
        self.respond(reply, &text, Some(&keyboard)).await
    }

    async fn manage_groups(&self, reply: Reply) -> Result<()> {
        let (text, keyboard) = {
            let engine = self.engine.lock().await;
            render::groups_view(
                engine.groups().len(),
                engine.delivering_groups(),
                &engine.top_groups(TOP_GROUPS),
            )
        };
        self.respond(reply, &text, Some(&keyboard)).await
    }

    async fn export_data(&self, reply: Reply, user: &User) -> Result<()> {
        let summary = match self.send_exports(user.id).await {
            Ok(summary) => summary,
            Err(e) => {
                log::error!("Export failed: {:#}", e);
                render::export_failed(&e)
            }
        };
        self.respond(reply, &summary, None).await
    }

    async fn send_exports(&self, chat_id: i64) -> Result<String> {
        let files = {
            let engine = self.engine.lock().await;
            ExportService::write(
                engine.store().base_path(),
                engine.quizzes(),
                engine.groups(),
                engine.stats(),
            )?
        };

        for (path, caption) in &files.documents {
            self.api.send_document(chat_id, path, caption).await?;
        }
        Ok(render::export_summary(files.quizzes, files.groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz_service::QuizEngine;
    use crate::store::JsonStore;
    use crate::testing::{RecordingBot, Sent};
    use quizcast_shared::{Chat, ChatMember, ChatMemberStatus};
    use tempfile::TempDir;

    const ADMIN: i64 = 1000;
    const GROUP: i64 = -100200;

    struct Harness {
        _dir: TempDir,
        bot: Arc<RecordingBot>,
        engine: SharedEngine,
        dispatcher: Dispatcher,
    }

    fn harness_with(bot: RecordingBot) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let engine = QuizEngine::load(JsonStore::new(dir.path()).unwrap()).shared();
        let bot = Arc::new(bot);
        let dispatcher = Dispatcher::new(bot.clone(), engine.clone(), ADMIN, Duration::ZERO, Duration::from_secs(3600));
        Harness {
            _dir: dir,
            bot,
            engine,
            dispatcher,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingBot::default())
    }

    fn user(id: i64) -> User {
        User {
            id,
            is_bot: false,
            first_name: "Tester".to_string(),
            username: None,
        }
    }

    fn private_chat(id: i64) -> Chat {
        Chat {
            id,
            kind: ChatKind::Private,
            title: None,
        }
    }

    fn group_chat() -> Chat {
        Chat {
            id: GROUP,
            kind: ChatKind::Supergroup,
            title: Some("Quiz Club".to_string()),
        }
    }

    fn message(from: i64, chat: Chat, text: &str) -> Update {
        Update {
            update_id: 1,
            message: Some(Message {
                message_id: 77,
                from: Some(user(from)),
                chat,
                text: Some(text.to_string()),
            }),
            callback_query: None,
            my_chat_member: None,
        }
    }

    fn callback(from: i64, data: &str) -> Update {
        Update {
            update_id: 2,
            message: None,
            callback_query: Some(CallbackQuery {
                id: "cb-1".to_string(),
                from: user(from),
                message: Some(Message {
                    message_id: 500,
                    from: None,
                    chat: private_chat(from),
                    text: Some("menu".to_string()),
                }),
                data: Some(data.to_string()),
            }),
            my_chat_member: None,
        }
    }

    #[test]
    fn command_parsing_ignores_bot_suffix_and_arguments() {
        assert_eq!(Command::parse("/start"), Some(Some(Command::Start)));
        assert_eq!(Command::parse("/stats@quiz_bot now"), Some(Some(Command::Stats)));
        assert_eq!(Command::parse("/unknown"), Some(None));
        assert_eq!(Command::parse("What is 2 + 2?"), None);
    }

    #[test]
    fn callback_parsing_reads_group_ids() {
        assert_eq!(CallbackAction::parse("stats"), Some(CallbackAction::Stats));
        assert_eq!(CallbackAction::parse("remove_group_-100200"), Some(CallbackAction::RemoveGroup(-100200)));
        assert_eq!(CallbackAction::parse("group_stats_-5"), Some(CallbackAction::GroupStats(-5)));
        assert_eq!(CallbackAction::parse("group_stats_abc"), None);
        assert_eq!(CallbackAction::parse("something_else"), None);
    }

    #[tokio::test]
    async fn admin_start_shows_dashboard() {
        let h = harness();
        h.dispatcher.dispatch(message(ADMIN, private_chat(ADMIN), "/start")).await.unwrap();

        let sent = h.bot.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("Admin Dashboard"));
        assert_eq!(sent[0].markup.as_ref().unwrap().inline_keyboard.len(), 5);
    }

    #[tokio::test]
    async fn stranger_start_gets_introduction() {
        let h = harness();
        h.dispatcher.dispatch(message(7, private_chat(7), "/start")).await.unwrap();

        assert!(h.bot.last_text().starts_with("👋 Hello! I'm a quiz bot"));
    }

    #[tokio::test]
    async fn start_in_group_registers_once() {
        let h = harness_with(RecordingBot::default().with_member_count(42));

        h.dispatcher.dispatch(message(7, group_chat(), "/start")).await.unwrap();
        assert!(h.bot.last_text().contains("Thanks for adding me to Quiz Club"));
        assert!(h.bot.sent()[0].markup.is_none());

        h.dispatcher.dispatch(message(ADMIN, group_chat(), "/start@quiz_bot")).await.unwrap();
        assert!(h.bot.last_text().contains("I'm back in Quiz Club"));
        assert!(h.bot.sent()[1].markup.is_some());

        let engine = h.engine.lock().await;
        assert_eq!(engine.groups().len(), 1);
        assert_eq!(engine.groups()[0].member_count, 42);
    }

    #[tokio::test]
    async fn member_count_failure_registers_with_zero() {
        let h = harness();
        h.dispatcher.dispatch(message(7, group_chat(), "/start")).await.unwrap();

        assert_eq!(h.engine.lock().await.groups()[0].member_count, 0);
    }

    #[tokio::test]
    async fn admin_commands_refused_for_others() {
        let h = harness();
        for command in ["/stats", "/broadcast", "/export", "/groups"] {
            h.dispatcher.dispatch(message(7, private_chat(7), command)).await.unwrap();
            assert_eq!(h.bot.last_text(), render::ADMIN_ONLY);
        }
        assert!(!h.engine.lock().await.in_broadcast(7));
    }

    #[tokio::test]
    async fn admin_text_is_saved_as_quiz() {
        let h = harness();
        h.dispatcher
            .dispatch(message(ADMIN, private_chat(ADMIN), "True or False: the Earth is flat"))
            .await
            .unwrap();

        let engine = h.engine.lock().await;
        assert_eq!(engine.quizzes().len(), 1);
        assert_eq!(engine.quizzes()[0].id, 77);
        assert!(h.bot.last_text().contains("Total quizzes: 1"));
        assert!(h.bot.last_text().contains("True or False: the Earth is flat..."));
    }

    #[tokio::test]
    async fn stranger_text_is_rejected() {
        let h = harness();
        h.dispatcher.dispatch(message(7, private_chat(7), "hello")).await.unwrap();

        assert_eq!(h.bot.last_text(), render::ADMIN_ONLY_PRIVATE);
        assert!(h.engine.lock().await.quizzes().is_empty());
    }

    #[tokio::test]
    async fn group_chatter_is_ignored() {
        let h = harness();
        h.dispatcher.dispatch(message(ADMIN, group_chat(), "just chatting")).await.unwrap();

        assert!(h.bot.calls().is_empty());
        assert!(h.engine.lock().await.quizzes().is_empty());
    }

    #[tokio::test]
    async fn broadcast_mode_sends_next_text_once() {
        let h = harness();
        h.engine.lock().await.register_group(GROUP, "Quiz Club", 0).unwrap();

        h.dispatcher.dispatch(message(ADMIN, private_chat(ADMIN), "/broadcast")).await.unwrap();
        assert!(h.bot.last_text().contains("broadcast to all 1 groups"));

        h.dispatcher.dispatch(message(ADMIN, private_chat(ADMIN), "Finals on Friday")).await.unwrap();
        let sent = h.bot.sent();
        assert_eq!(sent[1].chat_id, GROUP);
        assert!(sent[1].text.contains("Finals on Friday"));
        assert!(sent[2].text.contains("Broadcast Completed"));

        // Next message is a quiz again
        h.dispatcher.dispatch(message(ADMIN, private_chat(ADMIN), "Second text")).await.unwrap();
        assert_eq!(h.engine.lock().await.quizzes().len(), 1);
    }

    #[tokio::test]
    async fn cancel_button_leaves_broadcast_mode() {
        let h = harness();
        h.dispatcher.dispatch(callback(ADMIN, "broadcast")).await.unwrap();
        assert!(h.engine.lock().await.in_broadcast(ADMIN));

        h.dispatcher.dispatch(callback(ADMIN, "cancel_broadcast")).await.unwrap();

        assert!(!h.engine.lock().await.in_broadcast(ADMIN));
        assert_eq!(h.bot.last_text(), render::BROADCAST_CANCELLED);
    }

    #[tokio::test]
    async fn callbacks_edit_the_menu_and_are_answered() {
        let h = harness();
        h.dispatcher.dispatch(callback(ADMIN, "stats")).await.unwrap();

        let calls = h.bot.calls();
        assert_eq!(calls[0], Sent::Answer { id: "cb-1".to_string(), text: None });
        assert!(matches!(&calls[1], Sent::Edit { message_id: 500, text, .. } if text.contains("Detailed Bot Statistics")));
    }

    #[tokio::test]
    async fn export_button_is_answered_before_uploads() {
        let h = harness();
        h.engine.lock().await.add_quiz(1, "Q1").unwrap();

        h.dispatcher.dispatch(callback(ADMIN, "export_data")).await.unwrap();

        let calls = h.bot.calls();
        assert_eq!(calls[0], Sent::Answer { id: "cb-1".to_string(), text: None });
        assert!(matches!(&calls[1], Sent::Document { .. }));
        assert_eq!(calls.iter().filter(|c| matches!(c, Sent::Answer { .. })).count(), 1);
    }

    #[tokio::test]
    async fn cleaning_answers_before_editing() {
        let h = harness();
        h.engine.lock().await.register_group(-9, "Silent", 0).unwrap();

        h.dispatcher.dispatch(callback(ADMIN, "clean_inactive")).await.unwrap();

        let calls = h.bot.calls();
        assert_eq!(calls[0], Sent::Answer { id: "cb-1".to_string(), text: None });
        assert!(matches!(&calls[1], Sent::Edit { text, .. } if text.starts_with("✅ Cleaned 1 inactive groups")));
    }

    #[tokio::test]
    async fn unknown_callback_data_is_answered_silently() {
        let h = harness();
        h.dispatcher.dispatch(callback(ADMIN, "noop")).await.unwrap();

        assert_eq!(h.bot.calls(), vec![Sent::Answer { id: "cb-1".to_string(), text: None }]);
    }

    #[tokio::test]
    async fn callbacks_from_strangers_are_refused() {
        let h = harness();
        h.engine.lock().await.register_group(GROUP, "Quiz Club", 0).unwrap();

        h.dispatcher.dispatch(callback(7, &format!("remove_group_{GROUP}"))).await.unwrap();

        assert_eq!(h.engine.lock().await.groups().len(), 1);
        assert_eq!(
            h.bot.calls(),
            vec![Sent::Answer { id: "cb-1".to_string(), text: Some(render::ADMIN_ONLY.to_string()) }]
        );
    }

    #[tokio::test]
    async fn clean_inactive_without_candidates_only_answers() {
        let h = harness();
        h.engine.lock().await.register_group(GROUP, "Quiz Club", 0).unwrap();
        h.engine.lock().await.record_delivery(GROUP);

        h.dispatcher.dispatch(callback(ADMIN, "clean_inactive")).await.unwrap();

        assert_eq!(
            h.bot.calls(),
            vec![Sent::Answer { id: "cb-1".to_string(), text: Some(render::NO_INACTIVE_GROUPS.to_string()) }]
        );
    }

    #[tokio::test]
    async fn clean_inactive_removes_silent_groups() {
        let h = harness();
        h.engine.lock().await.register_group(GROUP, "Quiz Club", 0).unwrap();
        h.engine.lock().await.register_group(-9, "Silent", 0).unwrap();
        h.engine.lock().await.record_delivery(GROUP);

        h.dispatcher.dispatch(callback(ADMIN, "clean_inactive")).await.unwrap();

        assert!(h.bot.last_text().starts_with("✅ Cleaned 1 inactive groups"));
        assert_eq!(h.engine.lock().await.groups().len(), 1);
    }

    #[tokio::test]
    async fn group_stats_for_unknown_group_answers_notice() {
        let h = harness();
        h.dispatcher.dispatch(callback(ADMIN, "group_stats_-1")).await.unwrap();

        assert_eq!(
            h.bot.calls(),
            vec![Sent::Answer { id: "cb-1".to_string(), text: Some(render::GROUP_NOT_FOUND.to_string()) }]
        );
    }

    #[tokio::test]
    async fn remove_group_button_drops_group() {
        let h = harness();
        h.engine.lock().await.register_group(GROUP, "Quiz Club", 0).unwrap();

        h.dispatcher.dispatch(callback(ADMIN, &format!("remove_group_{GROUP}"))).await.unwrap();

        assert!(h.engine.lock().await.groups().is_empty());
        assert_eq!(h.bot.last_text(), render::GROUP_REMOVED);
    }

    #[tokio::test]
    async fn export_sends_documents_then_summary() {
        let h = harness();
        h.engine.lock().await.add_quiz(1, "Q1").unwrap();

        h.dispatcher.dispatch(message(ADMIN, private_chat(ADMIN), "/export")).await.unwrap();

        let documents: Vec<String> = h
            .bot
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Sent::Document { path, .. } => path.file_name().map(|n| n.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        assert_eq!(documents, vec!["quizzes_export.csv", "stats_export.json"]);
        assert!(h.bot.last_text().contains("Data Export Completed"));
    }

    #[tokio::test]
    async fn export_failure_is_reported_to_admin() {
        let h = harness_with(RecordingBot::default().failing_for(ADMIN));

        let result = h.dispatcher.dispatch(message(ADMIN, group_chat(), "/export")).await;

        assert!(result.is_ok());
        let calls = h.bot.calls();
        assert!(matches!(calls.last(), Some(Sent::Message { chat_id: GROUP, text, .. }) if text.starts_with("❌ Error exporting data")));
    }

    #[tokio::test]
    async fn kicked_bot_forgets_group() {
        let h = harness();
        h.engine.lock().await.register_group(GROUP, "Quiz Club", 0).unwrap();

        let update = Update {
            update_id: 3,
            message: None,
            callback_query: None,
            my_chat_member: Some(ChatMemberUpdated {
                chat: group_chat(),
                from: user(7),
                new_chat_member: ChatMember {
                    status: ChatMemberStatus::Kicked,
                    user: User {
                        id: 1,
                        is_bot: true,
                        first_name: "quiz_bot".to_string(),
                        username: None,
                    },
                },
            }),
        };
        h.dispatcher.dispatch(update).await.unwrap();

        assert!(h.engine.lock().await.groups().is_empty());
    }
}
