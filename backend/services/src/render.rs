//! Message texts and inline keyboards shown by the bot.

use crate::quiz_service::StatsSummary;
use chrono::{DateTime, Utc};
use quizcast_shared::{Group, InlineKeyboardButton, InlineKeyboardMarkup};
use std::time::Duration;

pub const ADMIN_ONLY: &str = "This command is for admin only.";
pub const ADMIN_ONLY_PRIVATE: &str = "I only accept commands from the admin.";
pub const BROADCAST_CANCELLED: &str = "❌ Broadcast cancelled.";
pub const NO_INACTIVE_GROUPS: &str = "No inactive groups found!";
pub const GROUP_NOT_FOUND: &str = "Group not found!";
pub const GROUP_REMOVED: &str =
    "✅ Group removed from database.\n\nThe bot will stop sending quizzes to this group.";

const PREVIEW_CHARS: usize = 100;
const MAX_LISTED_FAILURES: usize = 10;

/// Callback payloads carried by the inline buttons.
pub mod data {
    pub const STATS: &str = "stats";
    pub const ADD_QUIZ: &str = "add_quiz";
    pub const BROADCAST: &str = "broadcast";
    pub const MANAGE_GROUPS: &str = "manage_groups";
    pub const EXPORT_DATA: &str = "export_data";
    pub const CANCEL_BROADCAST: &str = "cancel_broadcast";
    pub const CLEAN_INACTIVE: &str = "clean_inactive";
    pub const REMOVE_GROUP_PREFIX: &str = "remove_group_";
    pub const GROUP_STATS_PREFIX: &str = "group_stats_";
}

fn button(text: &str, data: impl Into<String>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, data)
}

fn minutes(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

fn plural(count: u64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// The quiz interval in the largest whole unit, e.g. "1 hour" or "90 minutes".
pub fn interval_text(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs > 0 && secs % 3600 == 0 {
        plural(secs / 3600, "hour")
    } else if secs > 0 && secs % 60 == 0 {
        plural(secs / 60, "minute")
    } else {
        plural(secs, "second")
    }
}

fn cadence(interval: Duration) -> String {
    match interval_text(interval).as_str() {
        "1 hour" => "every hour".to_string(),
        text => format!("every {text}"),
    }
}

pub fn admin_dashboard() -> (String, InlineKeyboardMarkup) {
    let text = "👋 Admin Dashboard\n\n\
                I'm your Quiz Bot! Choose an option below:\n\n\
                📊 Statistics - View detailed bot analytics\n\
                📝 Add Quiz - Add new quizzes to the database\n\
                📢 Broadcast - Send message to all groups\n\
                👥 Manage Groups - View and manage groups\n\
                📋 Export Data - Export quizzes and stats\n\n\
                You can also simply send me any message to add it as a quiz!";
    let keyboard = InlineKeyboardMarkup::column([
        button("📊 View Statistics", data::STATS),
        button("📝 Add Quiz", data::ADD_QUIZ),
        button("📢 Broadcast", data::BROADCAST),
        button("👥 Manage Groups", data::MANAGE_GROUPS),
        button("📋 Export Data", data::EXPORT_DATA),
    ]);
    (text.to_string(), keyboard)
}

pub fn public_intro(interval: Duration) -> String {
    let every = cadence(interval);
    format!(
        "👋 Hello! I'm a quiz bot that sends random quizzes {every}.\n\n\
         Add me to your group and make me an admin to start receiving fun quizzes!\n\n\
         ⚡ Features:\n\
         • Auto quizzes {every}\n\
         • Diverse question database\n\
         • Engaging group activities"
    )
}

pub fn group_welcome(title: &str, is_new: bool, interval: Duration) -> String {
    let every = cadence(interval);
    if is_new {
        format!("🎉 Thanks for adding me to {title}!\n\nI'll send random quizzes {every} automatically!")
    } else {
        format!("🎉 I'm back in {title}! I'll continue sending quizzes {every}.")
    }
}

pub fn group_admin_keyboard(chat_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::column([
        button("🚫 Remove from Group", format!("{}{}", data::REMOVE_GROUP_PREFIX, chat_id)),
        button("📊 Group Stats", format!("{}{}", data::GROUP_STATS_PREFIX, chat_id)),
    ])
}

pub fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}

pub fn quiz_saved(total_quizzes: usize, total_groups: usize, text: &str) -> String {
    format!(
        "✅ Quiz Saved Successfully!\n\n\
         📝 Total quizzes: {total_quizzes}\n\
         📊 This quiz will be sent randomly to {total_groups} groups\n\n\
         💡 Preview:\n{}",
        preview(text)
    )
}

pub fn add_quiz_help() -> String {
    "📝 Add New Quiz\n\n\
     Simply send me any message and I'll save it as a quiz!\n\n\
     For example:\n\
     • What's the capital of France?\n\
     • Solve this riddle: I speak without a mouth...\n\
     • True or False: The Earth is flat\n\n\
     Just type your quiz and send it now! ✅"
        .to_string()
}

pub fn quiz_post(text: &str, interval: Duration) -> String {
    format!(
        "🎯 Random Quiz!\n\n{text}\n\n\
         💬 Discuss your answers in the group!\n\
         🕐 Next quiz in {} ⏰",
        interval_text(interval)
    )
}

pub fn stats_view(summary: &StatsSummary, interval: Duration) -> (String, InlineKeyboardMarkup) {
    let last_sent = summary
        .last_quiz_sent
        .map(minutes)
        .unwrap_or_else(|| "Never".to_string());

    let text = format!(
        "📊 Detailed Bot Statistics\n\n\
         📝 Quizzes Database\n\
         \u{20}  • Total quizzes: {}\n\
         \u{20}  • Quizzes added: {}\n\
         \u{20}  • Most sent quiz: {} times\n\n\
         👥 Groups Analytics\n\
         \u{20}  • Total groups: {}\n\
         \u{20}  • Active groups: {}\n\
         \u{20}  • Total quizzes sent: {}\n\n\
         ⏰ Performance\n\
         \u{20}  • Bot started: {}\n\
         \u{20}  • Last quiz sent: {}\n\
         \u{20}  • Next quiz in: ~{}\n\n\
         📈 Engagement\n\
         \u{20}  • Avg quizzes per group: {:.1}\n\
         \u{20}  • Total engagement score: {}\n",
        summary.total_quizzes,
        summary.quizzes_added,
        summary.most_sent,
        summary.total_groups,
        summary.active_groups,
        summary.total_quizzes_sent,
        minutes(summary.bot_start_time),
        last_sent,
        interval_text(interval),
        summary.avg_quizzes_per_group(),
        summary.engagement_total,
    );
    let keyboard = InlineKeyboardMarkup::column([
        button("📋 Export Data", data::EXPORT_DATA),
        button("🔄 Refresh", data::STATS),
        button("📢 Broadcast", data::BROADCAST),
    ]);
    (text, keyboard)
}

pub fn broadcast_prompt(total_groups: usize) -> (String, InlineKeyboardMarkup) {
    let text = format!(
        "📢 Broadcast Mode Activated\n\n\
         Please send the message you want to broadcast to all {total_groups} groups.\n\n\
         ⚠️ Warning: This will send your message to all groups immediately!\n\
         ✏️ Type your message now..."
    );
    let keyboard = InlineKeyboardMarkup::column([button("❌ Cancel Broadcast", data::CANCEL_BROADCAST)]);
    (text, keyboard)
}

pub fn announcement(text: &str) -> String {
    format!("📢 Announcement\n\n{text}\n\n- Admin")
}

pub fn broadcast_report(sent: usize, total: usize, failed: &[String]) -> String {
    let mut report = format!(
        "✅ Broadcast Completed\n\n\
         📤 Sent to: {sent}/{total} groups\n\
         ✅ Successful: {sent}\n\
         ❌ Failed: {}\n",
        failed.len()
    );

    if !failed.is_empty() {
        report.push_str("\nFailed groups:\n");
        let listed: Vec<&str> = failed
            .iter()
            .take(MAX_LISTED_FAILURES)
            .map(String::as_str)
            .collect();
        report.push_str(&listed.join("\n"));
        if failed.len() > MAX_LISTED_FAILURES {
            report.push_str(&format!("\n... and {} more", failed.len() - MAX_LISTED_FAILURES));
        }
    }
    report
}

pub fn groups_view(total: usize, active: usize, top: &[Group]) -> (String, InlineKeyboardMarkup) {
    let mut text = format!(
        "👥 Group Management\n\n\
         📊 Overview\n\
         • Total groups: {total}\n\
         • Active groups: {active}\n\
         • Inactive groups: {}\n\n",
        total.saturating_sub(active)
    );

    if !top.is_empty() {
        text.push_str("🏆 Top 5 Active Groups:\n");
        for (i, group) in top.iter().enumerate() {
            text.push_str(&format!(
                "{}. {} - {} quizzes\n",
                i + 1,
                group.title,
                group.quizzes_received
            ));
        }
    }

    let keyboard = InlineKeyboardMarkup::column([
        button("🔄 Refresh", data::MANAGE_GROUPS),
        button("📊 Statistics", data::STATS),
        button("🗑️ Clean Inactive", data::CLEAN_INACTIVE),
    ]);
    (text, keyboard)
}

pub fn cleaned_groups(removed: usize, remaining: usize) -> String {
    format!(
        "✅ Cleaned {removed} inactive groups\n\n\
         Removed groups that never received any quizzes (likely removed the bot).\n\
         Current active groups: {remaining}"
    )
}

pub fn group_stats(group: &Group) -> (String, InlineKeyboardMarkup) {
    let text = format!(
        "📊 Group Statistics\n\n\
         🏷️ Name: {}\n\
         🆔 ID: {}\n\
         📅 Added: {}\n\
         📤 Quizzes Received: {}\n\
         👥 Members: {}\n\
         🕐 Last Activity: {}\n",
        group.title,
        group.chat_id,
        group.added_date.format("%Y-%m-%d"),
        group.quizzes_received,
        group.member_count,
        minutes(group.last_activity),
    );
    let keyboard = InlineKeyboardMarkup::column([
        button("🚫 Remove Group", format!("{}{}", data::REMOVE_GROUP_PREFIX, group.chat_id)),
        button("👥 All Groups", data::MANAGE_GROUPS),
    ]);
    (text, keyboard)
}

pub fn export_summary(quizzes: usize, groups: usize) -> String {
    format!(
        "✅ Data Export Completed\n\n\
         📁 Files exported:\n\
         • quizzes_export.csv ({quizzes} quizzes)\n\
         • groups_export.csv ({groups} groups)\n\
         • stats_export.json (statistics)\n\n\
         💾 All data has been exported successfully!"
    )
}

pub fn export_failed(error: &anyhow::Error) -> String {
    format!("❌ Error exporting data: {error}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(150);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(preview("short"), "short...");
    }

    #[test]
    fn report_lists_at_most_ten_failures() {
        let failed: Vec<String> = (1..=13).map(|i| format!("Group {i}")).collect();
        let report = broadcast_report(2, 15, &failed);

        assert!(report.contains("📤 Sent to: 2/15 groups"));
        assert!(report.contains("❌ Failed: 13"));
        assert!(report.contains("Group 10"));
        assert!(!report.contains("Group 11"));
        assert!(report.ends_with("... and 3 more"));
    }

    #[test]
    fn report_without_failures_has_no_list() {
        let report = broadcast_report(3, 3, &[]);
        assert!(!report.contains("Failed groups"));
    }

    #[test]
    fn stats_view_formats_dates_and_average() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let summary = StatsSummary {
            total_quizzes: 4,
            quizzes_added: 4,
            most_sent: 2,
            total_groups: 3,
            active_groups: 2,
            total_quizzes_sent: 7,
            bot_start_time: start,
            last_quiz_sent: None,
            engagement_total: 6,
        };

        let (text, keyboard) = stats_view(&summary, Duration::from_secs(3600));
        assert!(text.contains("Bot started: 2024-05-01 08:30"));
        assert!(text.contains("Next quiz in: ~1 hour"));
        assert!(text.contains("Last quiz sent: Never"));
        assert!(text.contains("Avg quizzes per group: 2.3"));
        assert_eq!(keyboard.inline_keyboard.len(), 3);
    }

    #[test]
    fn interval_is_shown_in_largest_whole_unit() {
        assert_eq!(interval_text(Duration::from_secs(3600)), "1 hour");
        assert_eq!(interval_text(Duration::from_secs(7200)), "2 hours");
        assert_eq!(interval_text(Duration::from_secs(5400)), "90 minutes");
        assert_eq!(interval_text(Duration::from_secs(60)), "1 minute");
        assert_eq!(interval_text(Duration::from_secs(45)), "45 seconds");
    }

    #[test]
    fn texts_follow_the_configured_interval() {
        let every_half_hour = Duration::from_secs(1800);

        assert!(quiz_post("Q?", every_half_hour).ends_with("🕐 Next quiz in 30 minutes ⏰"));
        assert!(public_intro(every_half_hour).contains("random quizzes every 30 minutes."));
        assert!(group_welcome("Club", true, every_half_hour).contains("quizzes every 30 minutes automatically"));
        assert!(public_intro(Duration::from_secs(3600)).contains("random quizzes every hour."));
        assert!(quiz_post("Q?", Duration::from_secs(3600)).ends_with("🕐 Next quiz in 1 hour ⏰"));
    }

    #[test]
    fn group_keyboard_embeds_chat_id() {
        let keyboard = group_admin_keyboard(-100555);
        assert_eq!(keyboard.inline_keyboard[0][0].callback_data, "remove_group_-100555");
        assert_eq!(keyboard.inline_keyboard[1][0].callback_data, "group_stats_-100555");
    }
}
