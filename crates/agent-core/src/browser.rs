//! Browser process lifecycle for owned mode.

use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::errors::AgentError;

/// Launch a browser and drive its CDP message pump on a background task.
/// The returned handle ends when the browser process does.
pub async fn launch_browser(headless: bool) -> Result<(Browser, JoinHandle<()>), AgentError> {
    let mut builder = BrowserConfig::builder();
    if !headless {
        builder = builder.with_head();
    }
    let config = builder.build().map_err(AgentError::Browser)?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|err| AgentError::Browser(err.to_string()))?;

    let handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
        debug!("browser handler loop ended");
    });

    Ok((browser, handle))
}
