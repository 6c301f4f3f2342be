use std::{sync::Arc, time::Duration};

use replybot_core::config::TelegramConfig;
use replybot_core::ApplicationError;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::Update;
use crate::events::{EventContext, EventDispatcher, HandlerResult};
use crate::gateway::{GatewayError, MessagingGateway};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollingError {
    #[error("getUpdates failed {attempts} times in a row; last error: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: GatewayError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 500, max_delay_ms: 30_000 }
    }
}

impl From<&TelegramConfig> for ReconnectPolicy {
    fn from(config: &TelegramConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Counters reported when the runner stops cleanly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollingSummary {
    pub updates_received: u64,
    pub replies_sent: u64,
    pub send_failures: u64,
    pub ignored: u64,
}

pub struct PollingRunner {
    gateway: Arc<dyn MessagingGateway>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
    poll_timeout_secs: u64,
}

impl PollingRunner {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
        poll_timeout_secs: u64,
    ) -> Self {
        Self { gateway, dispatcher, reconnect_policy, poll_timeout_secs }
    }

    /// Polls until `shutdown` turns true (or its sender is dropped).
    ///
    /// The offset moves past every received update whether or not it produced a reply, so
    /// nothing is delivered twice. Only `getUpdates` failures count toward the retry budget.
    pub async fn run(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<PollingSummary, PollingError> {
        let mut summary = PollingSummary::default();
        let mut offset: Option<i64> = None;
        // Offset last sent on a successful `getUpdates`, which confirms everything before it.
        let mut confirmed: Option<i64> = None;
        let mut failures: u32 = 0;

        info!(
            event_name = "ingress.telegram.polling_started",
            poll_timeout_secs = self.poll_timeout_secs,
            max_retries = self.reconnect_policy.max_retries,
            "starting telegram long polling"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                received = self.gateway.get_updates(offset, self.poll_timeout_secs) => received,
            };

            match received {
                Ok(updates) => {
                    failures = 0;
                    confirmed = offset;
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        self.process(&update, &mut summary).await;
                    }
                }
                Err(error) => {
                    warn!(
                        event_name = "ingress.telegram.poll_failed",
                        attempt = failures,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %error,
                        "telegram getUpdates failed"
                    );

                    if failures >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "telegram polling retries exhausted"
                        );
                        return Err(PollingError::RetriesExhausted {
                            attempts: failures + 1,
                            last_error: error,
                        });
                    }

                    let delay = self.reconnect_policy.backoff(failures);
                    failures += 1;
                    if !delay.is_zero() {
                        tokio::select! {
                            _ = shutdown.changed() => {}
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }

        if offset.is_some() && offset != confirmed {
            self.confirm_offset(offset).await;
        }

        info!(
            event_name = "ingress.telegram.polling_stopped",
            updates_received = summary.updates_received,
            replies_sent = summary.replies_sent,
            send_failures = summary.send_failures,
            "telegram long polling stopped"
        );
        Ok(summary)
    }

    /// Acknowledges handled updates so Telegram does not redeliver them after a restart.
    async fn confirm_offset(&self, offset: Option<i64>) {
        match self.gateway.get_updates(offset, 0).await {
            Ok(_) => debug!(offset = ?offset, "confirmed handled updates before stopping"),
            Err(error) => warn!(
                event_name = "ingress.telegram.confirm_failed",
                offset = ?offset,
                error = %error,
                "failed to confirm handled updates; they may be redelivered"
            ),
        }
    }

    async fn process(&self, update: &Update, summary: &mut PollingSummary) {
        summary.updates_received += 1;
        let context = EventContext::for_update(update);

        info!(
            event_name = "ingress.telegram.update_received",
            update_id = update.update_id,
            update_kind = ?update.kind(),
            correlation_id = %context.correlation_id,
            "received telegram update"
        );

        let action = match self.dispatcher.dispatch(update, &context).await {
            Ok(HandlerResult::Responded(action)) => action,
            Ok(HandlerResult::Ignored) => {
                summary.ignored += 1;
                debug!(correlation_id = %context.correlation_id, "update ignored");
                return;
            }
            Err(error) => {
                summary.ignored += 1;
                warn!(
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "update dispatch failed; continuing polling loop"
                );
                return;
            }
        };

        match self.gateway.send_message(&action).await {
            Ok(sent) => {
                summary.replies_sent += 1;
                info!(
                    event_name = "egress.telegram.reply_sent",
                    correlation_id = %context.correlation_id,
                    chat_id = action.chat_id,
                    intent = %action.intent,
                    message_id = sent.message_id,
                    "sent reply"
                );
            }
            Err(error) => {
                summary.send_failures += 1;
                let failure = ApplicationError::Gateway(error.to_string());
                warn!(
                    event_name = "egress.telegram.reply_failed",
                    correlation_id = %context.correlation_id,
                    chat_id = action.chat_id,
                    intent = %action.intent,
                    error_class = failure.error_class(),
                    error = %failure,
                    "failed to send reply; not retrying"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use replybot_core::{
        CompanyProfile, FixedPicker, Intent, KeywordTable, Responder, ResponseCatalog, SendAction,
    };
    use tokio::sync::{watch, Mutex};

    use super::{PollingError, PollingRunner, ReconnectPolicy};
    use crate::api::{BotCommandSpec, Chat, Message, Update, User};
    use crate::events::default_dispatcher;
    use crate::gateway::{GatewayError, MessagingGateway};

    /// Plays back a fixed script of `getUpdates` results, then requests shutdown.
    struct ScriptedGateway {
        state: Mutex<ScriptedState>,
        shutdown: watch::Sender<bool>,
    }

    #[derive(Default)]
    struct ScriptedState {
        polls: VecDeque<Result<Vec<Update>, GatewayError>>,
        send_results: VecDeque<Result<(), GatewayError>>,
        offsets: Vec<Option<i64>>,
        timeouts: Vec<u64>,
        sent: Vec<SendAction>,
        shutdown_on_send: bool,
    }

    impl ScriptedGateway {
        fn with_script(
            polls: Vec<Result<Vec<Update>, GatewayError>>,
            send_results: Vec<Result<(), GatewayError>>,
        ) -> (Arc<Self>, watch::Receiver<bool>) {
            let (shutdown, receiver) = watch::channel(false);
            let gateway = Arc::new(Self {
                state: Mutex::new(ScriptedState {
                    polls: polls.into(),
                    send_results: send_results.into(),
                    ..ScriptedState::default()
                }),
                shutdown,
            });
            (gateway, receiver)
        }

        async fn request_shutdown_on_send(&self) {
            self.state.lock().await.shutdown_on_send = true;
        }

        async fn timeouts(&self) -> Vec<u64> {
            self.state.lock().await.timeouts.clone()
        }

        async fn offsets(&self) -> Vec<Option<i64>> {
            self.state.lock().await.offsets.clone()
        }

        async fn sent(&self) -> Vec<SendAction> {
            self.state.lock().await.sent.clone()
        }
    }

    #[async_trait]
    impl MessagingGateway for ScriptedGateway {
        async fn get_me(&self) -> Result<User, GatewayError> {
            Ok(User {
                id: 1,
                is_bot: true,
                first_name: "Replybot".to_owned(),
                username: Some("brantech_bot".to_owned()),
            })
        }

        async fn get_updates(
            &self,
            offset: Option<i64>,
            timeout_secs: u64,
        ) -> Result<Vec<Update>, GatewayError> {
            let mut state = self.state.lock().await;
            state.offsets.push(offset);
            state.timeouts.push(timeout_secs);
            match state.polls.pop_front() {
                Some(result) => result,
                None => {
                    let _ = self.shutdown.send(true);
                    Ok(Vec::new())
                }
            }
        }

        async fn send_message(&self, action: &SendAction) -> Result<Message, GatewayError> {
            let mut state = self.state.lock().await;
            state.sent.push(action.clone());
            if state.shutdown_on_send {
                let _ = self.shutdown.send(true);
            }
            state.send_results.pop_front().unwrap_or(Ok(()))?;
            Ok(Message {
                message_id: state.sent.len() as i64,
                date: 1_730_000_000,
                chat: Chat { id: action.chat_id, kind: "private".to_owned() },
                from: None,
                text: Some(action.text.clone()),
            })
        }

        async fn set_my_commands(&self, _commands: &[BotCommandSpec]) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn text_update(update_id: i64, chat_id: i64, text: &str) -> Update {
        Update {
            update_id,
            message: Some(Message {
                message_id: update_id,
                date: 1_730_000_000,
                chat: Chat { id: chat_id, kind: "private".to_owned() },
                from: None,
                text: Some(text.to_owned()),
            }),
            edited_message: None,
        }
    }

    fn runner(gateway: Arc<ScriptedGateway>, max_retries: u32) -> PollingRunner {
        let catalog = ResponseCatalog::from_profile(&CompanyProfile::default()).expect("catalog");
        let responder =
            Responder::new(KeywordTable::default(), Arc::new(catalog), Arc::new(FixedPicker(0)));
        PollingRunner::new(
            gateway,
            default_dispatcher(Arc::new(responder), Some("brantech_bot".to_owned())),
            ReconnectPolicy { max_retries, base_delay_ms: 0, max_delay_ms: 0 },
            25,
        )
    }

    #[tokio::test]
    async fn replies_once_per_message_and_advances_offset() {
        let (gateway, shutdown) = ScriptedGateway::with_script(
            vec![
                Ok(vec![text_update(10, 1, "hello"), text_update(11, 2, "/contact")]),
                Ok(vec![text_update(12, 1, "xyzzy plugh")]),
            ],
            vec![],
        );

        let summary = runner(gateway.clone(), 2).run(shutdown).await.expect("runner");

        assert_eq!(gateway.offsets().await, vec![None, Some(12), Some(13)]);
        let intents = gateway.sent().await.iter().map(|action| action.intent).collect::<Vec<_>>();
        assert_eq!(intents, vec![Intent::Start, Intent::Contact, Intent::Fallback]);
        assert_eq!(summary.updates_received, 3);
        assert_eq!(summary.replies_sent, 3);
    }

    #[tokio::test]
    async fn shutdown_after_reply_confirms_offset_before_stopping() {
        let (gateway, shutdown) =
            ScriptedGateway::with_script(vec![Ok(vec![text_update(30, 1, "hello")])], vec![]);
        gateway.request_shutdown_on_send().await;

        let summary = runner(gateway.clone(), 2).run(shutdown).await.expect("runner");

        assert_eq!(summary.replies_sent, 1);
        assert_eq!(gateway.offsets().await, vec![None, Some(31)]);
        assert_eq!(gateway.timeouts().await, vec![25, 0]);
    }

    #[tokio::test]
    async fn confirmed_offset_is_not_requested_twice() {
        let (gateway, shutdown) =
            ScriptedGateway::with_script(vec![Ok(vec![text_update(50, 1, "hello")])], vec![]);

        runner(gateway.clone(), 2).run(shutdown).await.expect("runner");

        assert_eq!(gateway.offsets().await, vec![None, Some(51)]);
        assert_eq!(gateway.timeouts().await, vec![25, 25]);
    }

    #[tokio::test]
    async fn ignored_updates_still_advance_offset() {
        let (gateway, shutdown) = ScriptedGateway::with_script(
            vec![Ok(vec![
                text_update(20, 1, "/help@other_bot"),
                Update { update_id: 21, message: None, edited_message: None },
            ])],
            vec![],
        );

        let summary = runner(gateway.clone(), 2).run(shutdown).await.expect("runner");

        assert_eq!(gateway.offsets().await, vec![None, Some(22)]);
        assert!(gateway.sent().await.is_empty());
        assert_eq!(summary.ignored, 2);
    }

    #[tokio::test]
    async fn send_failure_is_not_retried_and_loop_continues() {
        let (gateway, shutdown) = ScriptedGateway::with_script(
            vec![Ok(vec![text_update(30, 1, "hello"), text_update(31, 1, "help")])],
            vec![Err(GatewayError::Api {
                method: "sendMessage".to_owned(),
                code: Some(403),
                description: "Forbidden: bot was blocked by the user".to_owned(),
            })],
        );

        let summary = runner(gateway.clone(), 2).run(shutdown).await.expect("runner");

        assert_eq!(gateway.sent().await.len(), 2);
        assert_eq!(summary.send_failures, 1);
        assert_eq!(summary.replies_sent, 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_poll_failures() {
        let (gateway, shutdown) = ScriptedGateway::with_script(
            vec![
                Err(GatewayError::Http("connection reset".to_owned())),
                Err(GatewayError::Http("connection reset".to_owned())),
                Ok(vec![text_update(40, 1, "services")]),
                Err(GatewayError::Http("connection reset".to_owned())),
                Err(GatewayError::Http("connection reset".to_owned())),
            ],
            vec![],
        );

        let summary = runner(gateway.clone(), 2).run(shutdown).await.expect("failures reset");

        assert_eq!(summary.replies_sent, 1);
        assert_eq!(gateway.offsets().await.len(), 6);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let (gateway, shutdown) = ScriptedGateway::with_script(
            vec![
                Err(GatewayError::Http("fail-1".to_owned())),
                Err(GatewayError::Http("fail-2".to_owned())),
                Err(GatewayError::Http("fail-3".to_owned())),
            ],
            vec![],
        );

        let error = runner(gateway.clone(), 2).run(shutdown).await.expect_err("retries exhausted");

        assert_eq!(
            error,
            PollingError::RetriesExhausted {
                attempts: 3,
                last_error: GatewayError::Http("fail-3".to_owned()),
            }
        );
        assert_eq!(gateway.offsets().await.len(), 3);
    }

    #[tokio::test]
    async fn stops_immediately_when_shutdown_already_requested() {
        let (gateway, _) = ScriptedGateway::with_script(vec![], vec![]);
        let (sender, receiver) = watch::channel(true);

        let summary = runner(gateway.clone(), 2).run(receiver).await.expect("runner");
        drop(sender);

        assert_eq!(summary.updates_received, 0);
        assert!(gateway.offsets().await.is_empty());
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let policy = ReconnectPolicy { max_retries: 5, base_delay_ms: 100, max_delay_ms: 1_000 };

        let delays = (0..5).map(|attempt| policy.backoff(attempt).as_millis()).collect::<Vec<_>>();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000]);
    }
}
