//! Message pipeline orchestration.
//!
//! `Received → Gated → RateChecked → Normalized → Dispatched`, or `Rejected` at
//! the gate or the rate limiter. Nothing here returns an error: every run ends
//! in an [`Outcome`].

use std::{sync::Arc, time::Instant};

use chrono::{Local, NaiveTime};
use tokio::sync::Mutex;

use crate::{
    attachments::{AttachmentNormalizer, NormalizerLimits},
    config::Config,
    job::PrintJob,
    messaging::{port::MessagingPort, types::InboundMessage},
    policy::{is_eligible, ActiveWindow, ChannelPolicy},
    ports::{AttachmentFetcher, PrinterSink},
    security::RateLimiter,
    sequencer::PrintSequencer,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Wrong channel, nothing to print, or outside the active window.
    Ineligible,
    RateLimited,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Printed { images: usize },
    Rejected(Rejection),
    /// The printer write failed; the job was dropped.
    PrintFailed,
}

pub struct MessageDispatcher {
    policy: ChannelPolicy,
    window: ActiveWindow,
    rate_limiter: Mutex<RateLimiter>,
    normalizer: AttachmentNormalizer,
    sequencer: PrintSequencer,
    printer: Arc<dyn PrinterSink>,
    messenger: Arc<dyn MessagingPort>,
    ack_emoji: String,
}

impl MessageDispatcher {
    pub fn new(
        cfg: &Config,
        fetcher: Arc<dyn AttachmentFetcher>,
        printer: Arc<dyn PrinterSink>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Result<Self> {
        Ok(Self {
            policy: cfg.channel_policy()?,
            window: cfg.active_window,
            rate_limiter: Mutex::new(RateLimiter::new(
                cfg.rate_limit_enabled,
                cfg.rate_limit_requests,
                cfg.rate_limit_window,
            )),
            normalizer: AttachmentNormalizer::new(
                fetcher,
                NormalizerLimits::from_config(cfg),
                cfg.fetch_concurrency,
            ),
            sequencer: PrintSequencer::new(),
            printer,
            messenger,
            ack_emoji: cfg.ack_emoji.clone(),
        })
    }

    pub fn policy(&self) -> &ChannelPolicy {
        &self.policy
    }

    pub async fn handle(&self, msg: InboundMessage) -> Outcome {
        self.handle_at(msg, Instant::now(), Local::now().time()).await
    }

    /// Run the pipeline with an explicit clock (`now` for rate limiting,
    /// `time_of_day` for the active window).
    pub async fn handle_at(
        &self,
        msg: InboundMessage,
        now: Instant,
        time_of_day: NaiveTime,
    ) -> Outcome {
        let chat_id = msg.chat_id().0;
        let user_id = msg.author_id.0;

        if !is_eligible(&msg, &self.policy, &self.window, time_of_day) {
            tracing::debug!(chat_id, user_id, "message not eligible for printing");
            return Outcome::Rejected(Rejection::Ineligible);
        }

        // Admission and ticket issue happen under one lock so print order
        // matches admission order.
        let mut ticket = {
            let mut rl = self.rate_limiter.lock().await;
            if !rl.check_at(msg.author_id, now) {
                tracing::info!(chat_id, user_id, "message rate limited");
                return Outcome::Rejected(Rejection::RateLimited);
            }
            self.sequencer.issue().await
        };

        let images = self
            .normalizer
            .fetch_and_normalize(&msg.attachments)
            .await;
        let inverted = self.policy.is_inverted(msg.chat_id());
        let job = PrintJob::for_message(&msg, inverted, images);
        let image_count = job.image_count();

        ticket.wait_turn().await;
        if let Err(e) = self.printer.print(&job).await {
            tracing::error!(chat_id, user_id, "print failed, dropping job: {e}");
            return Outcome::PrintFailed;
        }
        drop(ticket);

        tracing::info!(
            chat_id,
            user_id,
            inverted,
            images = image_count,
            attachments = msg.attachments.len(),
            "message printed"
        );

        if self.messenger.capabilities().supports_reactions {
            if let Err(e) = self
                .messenger
                .set_reaction(msg.message, &self.ack_emoji)
                .await
            {
                tracing::warn!(chat_id, user_id, "acknowledgment failed: {e}");
            }
        }

        Outcome::Printed {
            images: image_count,
        }
    }
}
