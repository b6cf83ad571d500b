//! Fire-and-forget handoff of notifications to the transport.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{NotificationMessage, NotificationTransport};

/// Spawns one delivery task per message. The decision that produced the
/// message is already persisted by the time dispatch runs, so delivery
/// failures are logged and never surfaced to the caller.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn NotificationTransport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self { transport }
    }

    /// Returns the spawned task handle. Callers on the request path drop it;
    /// tests await it to observe the delivery attempt.
    pub fn dispatch(&self, message: NotificationMessage) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            match transport.deliver(&message).await {
                Ok(()) => {
                    debug!(
                        kind = %message.kind,
                        recipient = %message.data.email,
                        "notification delivered"
                    );
                }
                Err(error) => {
                    warn!(
                        event_name = "notification_dispatch_failed",
                        kind = %message.kind,
                        recipient = %message.data.email,
                        error = %error,
                        "notification delivery failed; decision already persisted"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::Dispatcher;
    use crate::{NotificationMessage, NotificationType, NotifyError, RecordingTransport};

    fn rejection() -> NotificationMessage {
        NotificationMessage::rejected(
            "evan@timeclerk.test",
            "Evan Okafor",
            NaiveDate::from_ymd_opt(2025, 1, 13).expect("valid date"),
            "Mona Vargas",
            "Missing Friday hours",
        )
    }

    #[tokio::test]
    async fn dispatch_delivers_in_background() {
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher = Dispatcher::new(transport.clone());

        dispatcher.dispatch(rejection()).await.expect("delivery task completes");

        let delivered = transport.delivered().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].kind, NotificationType::TimesheetRejected);
    }

    #[tokio::test]
    async fn dispatch_contains_delivery_failures() {
        let transport = Arc::new(RecordingTransport::failing(NotifyError::Status(503)));
        let dispatcher = Dispatcher::new(transport.clone());

        dispatcher.dispatch(rejection()).await.expect("task must not panic on failure");

        assert_eq!(transport.delivered().await.len(), 1, "attempt is still made");
    }
}
