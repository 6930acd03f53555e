use crate::config::Config;
use quizcast_services::{BotApi, Dispatcher, SharedEngine, deliver_round};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct WorkerService {
    api: Arc<dyn BotApi>,
    engine: SharedEngine,
    dispatcher: Dispatcher,
    config: Config,
}

impl WorkerService {
    pub fn new(api: Arc<dyn BotApi>, engine: SharedEngine, config: Config) -> Self {
        let dispatcher = Dispatcher::new(
            api.clone(),
            engine.clone(),
            config.admin_user_id,
            config.send_delay,
            config.quiz_interval,
        );
        Self {
            api,
            engine,
            dispatcher,
            config,
        }
    }

    pub async fn start(&self) {
        log::info!("Bot worker starting with configuration:");
        log::info!("  - Quiz interval: {:?}", self.config.quiz_interval);
        log::info!("  - Send delay: {:?}", self.config.send_delay);
        log::info!("  - Poll timeout: {:?}", self.config.poll_timeout);
        log::info!("  - Data directory: {}", self.config.data_dir.display());

        // Both loops run forever
        tokio::select! {
            _ = self.start_polling() => log::error!("Update polling task exited"),
            _ = self.start_quiz_schedule() => log::error!("Quiz schedule task exited"),
        }
    }

    // Long-polls the Bot API and handles updates in arrival order
    async fn start_polling(&self) {
        let mut offset: Option<i64> = None;

        loop {
            match self.api.get_updates(offset, self.config.poll_timeout).await {
                Ok(updates) => {
                    if !updates.is_empty() {
                        log::debug!("Received {} updates", updates.len());
                    }
                    for update in updates {
                        let update_id = update.update_id;
                        offset = Some(update_id + 1);
                        if let Err(e) = self.dispatcher.dispatch(update).await {
                            log::error!("Failed to handle update {}: {:#}", update_id, e);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Failed to fetch updates: {}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }

    // Sends a random quiz every interval; the first round waits a full interval
    async fn start_quiz_schedule(&self) {
        let interval = self.config.quiz_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let round = deliver_round(self.api.as_ref(), &self.engine, self.config.send_delay, interval);
            if let Err(e) = round.await {
                log::error!("Quiz round failed: {:#}", e);
            }
        }
    }
}
