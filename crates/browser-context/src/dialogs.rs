//! JavaScript dialog interception.
//!
//! Dialogs (`alert`, `confirm`, `prompt`, `beforeunload`) freeze the page
//! until answered, so every page gets a listener that parks the dialog in a
//! single-slot mailbox for the planner and arms a safety-net timer. If the
//! planner has not handled the dialog when the timer fires, it is dismissed
//! (accepted for `beforeunload`, which otherwise traps the tab).

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::{
    DialogType, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::ContextError;

/// How the planner (or the safety net) answers a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Accept,
    Dismiss,
}

/// A dialog waiting for an answer.
#[derive(Debug, Clone)]
pub struct PendingDialog {
    /// "alert", "confirm", "prompt" or "beforeunload".
    pub dialog_type: String,
    pub message: String,
}

impl PendingDialog {
    /// Banner prepended to the symbolic state so the planner sees the dialog
    /// before anything else.
    pub fn banner(&self) -> String {
        format!(
            "⚠️ [Alert Dialog] Type: {}, Message: {}\nHandle it with the 'handle_dialog' action \
             (value: \"accept\" or \"dismiss\") before doing anything else.",
            self.dialog_type, self.message
        )
    }
}

struct PendingSlot {
    info: PendingDialog,
    page: Page,
    generation: u64,
}

/// Single-slot dialog mailbox shared by the listener tasks, the safety-net
/// timers and the executor. At most one dialog is pending per browser
/// context; a newer dialog replaces the older one and invalidates its timer.
#[derive(Clone)]
pub struct DialogWatcher {
    slot: Arc<Mutex<Option<PendingSlot>>>,
    auto_close_after: Duration,
}

impl DialogWatcher {
    pub const DEFAULT_AUTO_CLOSE: Duration = Duration::from_secs(10);

    pub fn new() -> Self {
        Self::with_auto_close(Self::DEFAULT_AUTO_CLOSE)
    }

    pub fn with_auto_close(auto_close_after: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            auto_close_after,
        }
    }

    /// Subscribe to dialog events on a page. Idempotent per page in practice:
    /// the manager attaches exactly once, when the page enters the context.
    pub async fn attach(&self, page: &Page) -> Result<(), ContextError> {
        let mut events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(ContextError::driver)?;

        let watcher = self.clone();
        let page = page.clone();
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let dialog_type = dialog_type_name(&event.r#type).to_string();
                let message = event.message.clone();
                watcher.on_dialog(&page, dialog_type, message).await;
            }
        });
        Ok(())
    }

    async fn on_dialog(&self, page: &Page, dialog_type: String, message: String) {
        debug!(%dialog_type, %message, "dialog opened");

        let generation = {
            let mut slot = self.slot.lock();
            // Replacing the slot invalidates the previous dialog's timer.
            let generation = slot.as_ref().map(|s| s.generation + 1).unwrap_or(0);
            *slot = Some(PendingSlot {
                info: PendingDialog {
                    dialog_type,
                    message,
                },
                page: page.clone(),
                generation,
            });
            generation
        };

        // Safety net: a dialog left unanswered blocks every later action.
        let watcher = self.clone();
        let auto_close_after = self.auto_close_after;
        tokio::spawn(async move {
            tokio::time::sleep(auto_close_after).await;
            watcher.auto_close(generation).await;
        });
    }

    async fn auto_close(&self, generation: u64) {
        let taken = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(pending) if pending.generation == generation => slot.take(),
                _ => None, // handled meanwhile, or replaced by a newer dialog
            }
        };

        if let Some(pending) = taken {
            let choice = if pending.info.dialog_type == "beforeunload" {
                DialogChoice::Accept
            } else {
                DialogChoice::Dismiss
            };
            warn!(
                dialog_type = %pending.info.dialog_type,
                ?choice,
                "dialog unanswered, closing via safety net"
            );
            if let Err(err) = answer(&pending.page, choice).await {
                warn!("safety-net dialog close failed: {err}");
            }
        }
    }

    /// The currently pending dialog, if any.
    pub fn pending(&self) -> Option<PendingDialog> {
        self.slot.lock().as_ref().map(|s| s.info.clone())
    }

    /// Planner-driven handling. Taking the slot under the lock disarms the
    /// safety-net timer, so exactly one consumer answers the dialog.
    pub async fn handle(&self, choice: DialogChoice) -> Result<PendingDialog, ContextError> {
        let pending = self
            .slot
            .lock()
            .take()
            .ok_or(ContextError::NoPendingDialog)?;
        answer(&pending.page, choice).await?;
        Ok(pending.info)
    }

    /// Drop a pending dialog belonging to a page that was closed.
    pub fn forget_for_page(&self, page: &Page) {
        let mut slot = self.slot.lock();
        if let Some(pending) = slot.as_ref() {
            if pending.page.target_id() == page.target_id() {
                *slot = None;
            }
        }
    }
}

impl Default for DialogWatcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn answer(page: &Page, choice: DialogChoice) -> Result<(), ContextError> {
    let params = HandleJavaScriptDialogParams::builder()
        .accept(choice == DialogChoice::Accept)
        .build()
        .map_err(ContextError::Driver)?;
    page.execute(params).await.map_err(ContextError::driver)?;
    Ok(())
}

fn dialog_type_name(dialog_type: &DialogType) -> &'static str {
    match dialog_type {
        DialogType::Alert => "alert",
        DialogType::Confirm => "confirm",
        DialogType::Prompt => "prompt",
        DialogType::Beforeunload => "beforeunload",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_shape() {
        let pending = PendingDialog {
            dialog_type: "confirm".into(),
            message: "Leave this page?".into(),
        };
        let banner = pending.banner();
        assert!(banner.starts_with("⚠️ [Alert Dialog] Type: confirm, Message: Leave this page?"));
        assert!(banner.contains("handle_dialog"));
    }

    #[test]
    fn test_empty_mailbox() {
        let watcher = DialogWatcher::new();
        assert!(watcher.pending().is_none());
    }

    #[tokio::test]
    async fn test_handle_without_pending_errors() {
        let watcher = DialogWatcher::new();
        let err = watcher.handle(DialogChoice::Accept).await.unwrap_err();
        assert!(matches!(err, ContextError::NoPendingDialog));
    }
}
