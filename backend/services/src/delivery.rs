use crate::quiz_service::SharedEngine;
use crate::render;
use crate::telegram_service::BotApi;
use anyhow::Result;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub quiz_id: i64,
    pub sent: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub total: usize,
    pub failed: Vec<String>,
}

/// Sends one random quiz to every registered group.
///
/// The engine is only locked to plan the round and to book each delivery, so
/// commands keep being served while messages are in flight. Returns `None`
/// when there is nothing to send. `interval` is announced as the time to the
/// next quiz.
pub async fn deliver_round(
    api: &dyn BotApi,
    engine: &SharedEngine,
    send_delay: Duration,
    interval: Duration,
) -> Result<Option<RoundReport>> {
    let round = engine.lock().await.plan_round()?;
    let Some(round) = round else {
        log::info!("Skipping quiz round: no quizzes or no groups");
        return Ok(None);
    };

    let text = render::quiz_post(&round.text, interval);
    let mut sent = 0;
    for target in &round.targets {
        match api.send_message(target.chat_id, &text, None).await {
            Ok(()) => {
                engine.lock().await.record_delivery(target.chat_id);
                sent += 1;
                tokio::time::sleep(send_delay).await;
            }
            Err(e) => {
                log::warn!("Failed to send quiz to group {}: {}", target.chat_id, e);
            }
        }
    }

    engine.lock().await.persist()?;

    log::info!("📤 Sent quiz {} to {}/{} groups", round.quiz_id, sent, round.targets.len());
    Ok(Some(RoundReport {
        quiz_id: round.quiz_id,
        sent,
        total: round.targets.len(),
    }))
}

/// Sends an announcement to every registered group, collecting failed titles.
pub async fn broadcast(api: &dyn BotApi, engine: &SharedEngine, message: &str, send_delay: Duration) -> BroadcastReport {
    let targets = engine.lock().await.targets();
    let text = render::announcement(message);

    let mut sent = 0;
    let mut failed = Vec::new();
    for target in &targets {
        match api.send_message(target.chat_id, &text, None).await {
            Ok(()) => {
                sent += 1;
                tokio::time::sleep(send_delay).await;
            }
            Err(e) => {
                log::warn!("Failed to broadcast to {}: {}", target.title, e);
                failed.push(target.title.clone());
            }
        }
    }

    log::info!("Broadcast delivered to {}/{} groups", sent, targets.len());
    BroadcastReport {
        sent,
        total: targets.len(),
        failed,
    }
}
