//! Delivery of generated phrases to Discord.

use std::sync::Arc;

use serenity::http::Http;
use serenity::model::id::ChannelId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use talkbot_scheduler::PhraseDelivery;

/// Drain the scheduler's queue and post each phrase to its channel.
///
/// Uses REST only, so it keeps working across gateway reconnects. Exits when
/// every sender is dropped.
pub async fn run_phrase_delivery(http: Arc<Http>, mut rx: mpsc::Receiver<PhraseDelivery>) {
    while let Some(delivery) = rx.recv().await {
        let channel_id = ChannelId::new(delivery.channel_id);
        debug!(channel_id = delivery.channel_id, "delivering phrase");

        match crate::send::send_chunked(&http, channel_id, &delivery.text).await {
            Ok(()) => info!(channel_id = delivery.channel_id, "phrase delivered"),
            Err(e) => warn!(
                channel_id = delivery.channel_id,
                error = %e,
                "phrase delivery failed"
            ),
        }
    }

    info!("phrase delivery task exiting (queue closed)");
}
