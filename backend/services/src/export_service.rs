use anyhow::{Context, Result};
use quizcast_shared::{BotStats, Group, Quiz};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const QUIZZES_EXPORT: &str = "quizzes_export.csv";
pub const GROUPS_EXPORT: &str = "groups_export.csv";
pub const STATS_EXPORT: &str = "stats_export.json";

/// Files produced by one export, each paired with its document caption.
#[derive(Debug, Clone)]
pub struct ExportFiles {
    pub documents: Vec<(PathBuf, &'static str)>,
    pub quizzes: usize,
    pub groups: usize,
}

pub struct ExportService;

impl ExportService {
    /// Writes the CSV exports (skipped when empty) and the statistics JSON into `dir`.
    pub fn write(dir: &Path, quizzes: &[Quiz], groups: &[Group], stats: &BotStats) -> Result<ExportFiles> {
        let mut documents = Vec::new();

        if !quizzes.is_empty() {
            let path = dir.join(QUIZZES_EXPORT);
            Self::write_csv(&path, quizzes)?;
            documents.push((path, "📝 Quizzes Export (CSV)"));
        }

        if !groups.is_empty() {
            let path = dir.join(GROUPS_EXPORT);
            Self::write_csv(&path, groups)?;
            documents.push((path, "👥 Groups Export (CSV)"));
        }

        let path = dir.join(STATS_EXPORT);
        let json = serde_json::to_string_pretty(stats).context("Failed to serialize statistics")?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        documents.push((path, "📊 Statistics Export (JSON)"));

        log::info!("Exported {} quizzes and {} groups to {}", quizzes.len(), groups.len(), dir.display());
        Ok(ExportFiles {
            documents,
            quizzes: quizzes.len(),
            groups: groups.len(),
        })
    }

    fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn writes_all_three_files_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let quizzes = vec![Quiz::new(1, "Which is bigger, 2 or 3?", at)];
        let groups = vec![Group {
            chat_id: -42,
            title: "Trivia, \"Friday\" edition".to_string(),
            added_date: at,
            member_count: 9,
            quizzes_received: 2,
            last_activity: at,
        }];

        let files = ExportService::write(dir.path(), &quizzes, &groups, &BotStats::new(at)).unwrap();

        assert_eq!(files.documents.len(), 3);
        let quiz_csv = std::fs::read_to_string(dir.path().join(QUIZZES_EXPORT)).unwrap();
        let mut lines = quiz_csv.lines();
        assert_eq!(lines.next(), Some("id,text,added_date,sent_count,last_sent,engagement"));
        assert_eq!(lines.next(), Some("1,\"Which is bigger, 2 or 3?\",2024-01-02T03:04:05Z,0,,0"));

        let group_csv = std::fs::read_to_string(dir.path().join(GROUPS_EXPORT)).unwrap();
        assert!(group_csv.starts_with("chat_id,title,added_date,member_count,quizzes_received,last_activity\n"));
        assert!(group_csv.contains("\"Trivia, \"\"Friday\"\" edition\""));
    }

    #[test]
    fn empty_collections_only_export_statistics() {
        let dir = tempfile::tempdir().unwrap();

        let files = ExportService::write(dir.path(), &[], &[], &BotStats::new(Utc::now())).unwrap();

        assert_eq!(files.documents.len(), 1);
        assert!(files.documents[0].0.ends_with(STATS_EXPORT));
        assert!(!dir.path().join(QUIZZES_EXPORT).exists());
        assert!(!dir.path().join(GROUPS_EXPORT).exists());
    }

    #[test]
    fn statistics_keep_non_ascii_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut stats = BotStats::new(Utc::now());
        stats.group_engagement.insert("ñ".to_string(), 1);

        ExportService::write(dir.path(), &[], &[], &stats).unwrap();

        let raw = std::fs::read_to_string(dir.path().join(STATS_EXPORT)).unwrap();
        assert!(raw.contains("\"ñ\": 1"));
    }
}
