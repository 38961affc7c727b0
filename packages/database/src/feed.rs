//! Change feed for report mutations.
//!
//! Every write to the `reports` table publishes a lightweight
//! [`ReportChange`] notice. The notice is a nudge, not a delivery
//! guarantee: subscribers re-query the full snapshot on each notice, so a
//! lagged or dropped notice never loses data.

use serde::Serialize;
use tokio::sync::broadcast;

/// Default capacity of the broadcast channel.
///
/// Subscribers that fall further behind than this observe a lag error and
/// simply re-query.
const DEFAULT_CAPACITY: usize = 64;

/// What changed about a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    /// A new report was created.
    Created,
    /// A report's triage status changed.
    StatusChanged,
    /// A report's upvote set changed.
    UpvoteToggled,
}

/// A change notice published on the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportChange {
    /// What happened.
    pub kind: ChangeKind,
    /// The affected report.
    pub report_id: String,
}

/// Broadcast feed of report change notices.
///
/// `subscribe()` returns a receiver handle; dropping the handle
/// unsubscribes, so view teardown never leaks listeners.
pub struct ReportFeed {
    tx: broadcast::Sender<ReportChange>,
}

impl ReportFeed {
    /// Creates a feed with the given channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to change notices published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReportChange> {
        self.tx.subscribe()
    }

    /// Publishes a change notice to all current subscribers.
    ///
    /// A feed with no subscribers drops the notice silently.
    pub fn publish(&self, kind: ChangeKind, report_id: &str) {
        let change = ReportChange {
            kind,
            report_id: report_id.to_string(),
        };
        if self.tx.send(change).is_err() {
            log::trace!("No feed subscribers for {report_id} change");
        }
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ReportFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_notices_to_subscribers() {
        let feed = ReportFeed::default();
        let mut rx = feed.subscribe();

        feed.publish(ChangeKind::Created, "r1");
        feed.publish(ChangeKind::StatusChanged, "r1");

        assert_eq!(
            rx.recv().await.unwrap(),
            ReportChange {
                kind: ChangeKind::Created,
                report_id: "r1".to_string(),
            }
        );
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::StatusChanged);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_harmless() {
        let feed = ReportFeed::default();
        feed.publish(ChangeKind::UpvoteToggled, "r2");
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropping_receiver_unsubscribes() {
        let feed = ReportFeed::default();
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);
        drop(rx);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
