//! Push notification payloads and click handling.

use chrono::{DateTime, Utc};
use rwa_discount_core::ICON_192_URL;
use serde::{Deserialize, Serialize};

/// Body used when a push carries no payload.
pub const DEFAULT_PUSH_BODY: &str = "New deals available!";

/// Badge shown next to the notification.
pub const BADGE_URL: &str = "/icons/icon-72x72.png";

/// Action id that opens the app.
pub const ACTION_EXPLORE: &str = "explore";

/// Action id that only dismisses.
pub const ACTION_CLOSE: &str = "close";

/// A notification the agent asks the host to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// Data attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub date_of_arrival: DateTime<Utc>,
    pub primary_key: String,
}

/// A button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

impl Notification {
    /// The "new deals" notification for a push with an optional text payload.
    #[must_use]
    pub fn deals(app_name: &str, payload: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            title: app_name.to_string(),
            body: payload.map_or_else(|| DEFAULT_PUSH_BODY.to_string(), ToString::to_string),
            icon: ICON_192_URL.to_string(),
            badge: BADGE_URL.to_string(),
            vibrate: vec![100, 50, 100],
            data: NotificationData {
                date_of_arrival: now,
                primary_key: "2".to_string(),
            },
            actions: vec![
                NotificationAction {
                    action: ACTION_EXPLORE.to_string(),
                    title: "View Deals".to_string(),
                    icon: ICON_192_URL.to_string(),
                },
                NotificationAction {
                    action: ACTION_CLOSE.to_string(),
                    title: "Close".to_string(),
                    icon: ICON_192_URL.to_string(),
                },
            ],
        }
    }
}

/// What to do after a notification is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationClick {
    /// The notification is always closed.
    pub close: bool,
    /// Open a window at this path.
    pub open_window: Option<String>,
}

impl NotificationClick {
    /// Resolve a click on `action`.
    #[must_use]
    pub fn for_action(action: Option<&str>) -> Self {
        Self {
            close: true,
            open_window: (action == Some(ACTION_EXPLORE)).then(|| "/".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_body() {
        let n = Notification::deals("RwaDiscount", None, Utc::now());
        assert_eq!(n.title, "RwaDiscount");
        assert_eq!(n.body, DEFAULT_PUSH_BODY);
        assert_eq!(n.actions.len(), 2);
        assert_eq!(n.data.primary_key, "2");
    }

    #[test]
    fn test_payload_body() {
        let n = Notification::deals("RwaDiscount", Some("50% off pizza"), Utc::now());
        assert_eq!(n.body, "50% off pizza");
    }

    #[test]
    fn test_click_explore_opens_root() {
        let click = NotificationClick::for_action(Some(ACTION_EXPLORE));
        assert!(click.close);
        assert_eq!(click.open_window.as_deref(), Some("/"));
    }

    #[test]
    fn test_click_other_only_closes() {
        assert_eq!(NotificationClick::for_action(Some(ACTION_CLOSE)).open_window, None);
        assert_eq!(NotificationClick::for_action(None).open_window, None);
    }
}
