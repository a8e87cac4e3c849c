//! Notification surface injected into the controller.

use shared::domain::{Notification, NotificationKind};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Logs notifications; used when no view is attached.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let Notification {
            kind,
            title,
            message,
        } = notification;
        match kind {
            NotificationKind::Info | NotificationKind::Success => {
                info!(?kind, %title, %message, "notification")
            }
            NotificationKind::Warning => warn!(%title, %message, "notification"),
            NotificationKind::Error => error!(%title, %message, "notification"),
        }
    }
}

/// Forwards notifications to a receiver owned by the view layer.
pub struct ChannelNotifier {
    tx: UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            warn!("notification receiver dropped");
        }
    }
}
