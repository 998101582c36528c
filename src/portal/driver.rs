// src/portal/driver.rs
use std::future::Future;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::portal::models::{ArchiveJob, JobOutcome, PortalConfig};
use crate::utils::error::PortalError;
use crate::utils::logging::RunLog;

// Portal controls the driver interacts with, in click order.
const SELECT_ALL_SELECTOR: &str = "#Selectall span";
const BULK_DOWNLOAD_SELECTOR: &str = "#MultiDwnld";

// Poll interval while waiting for a control to become interactable.
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(500);

// Poll interval while waiting for the download manager to finish writing.
const DOWNLOAD_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Exclusively-owned browser session for one download attempt.
///
/// Owns the Chrome process plus the spawned task draining its CDP event
/// stream; `close` tears both down. The attempt body runs to a `Result`
/// before `close` is called so teardown happens on every exit path.
struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: &PortalConfig) -> Result<Self, PortalError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(PortalError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| PortalError::Launch(e.to_string()))?;

        // The event stream must be drained for the CDP connection to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        tracing::debug!("Browser session launched (headless: {})", config.headless);
        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Tears the session down. Failures here are logged and swallowed so
    /// they can never mask the attempt's primary outcome.
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser session: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Browser process did not exit cleanly: {}", e);
        }
        self.handler_task.abort();
    }
}

/// Waits up to `timeout` for `selector` to be present on the page.
async fn wait_for_element(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Result<Element, PortalError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match page.find_element(selector).await {
            Ok(element) => return Ok(element),
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
            }
            Err(_) => {
                return Err(PortalError::ElementTimeout {
                    selector: selector.to_string(),
                    waited_secs: timeout.as_secs(),
                })
            }
        }
    }
}

/// One full pass over the portal: navigate, select all reports, trigger the
/// bulk download, then give the download manager time to finish writing.
async fn run_browser_attempt(config: &PortalConfig) -> Result<(), PortalError> {
    let session = BrowserSession::launch(config).await?;
    let result = drive_bulk_download(&session.browser, config).await;
    session.close().await;
    result
}

async fn drive_bulk_download(browser: &Browser, config: &PortalConfig) -> Result<(), PortalError> {
    let page = browser
        .new_page(config.report_url.as_str())
        .await
        .map_err(|e| PortalError::Protocol(e.to_string()))?;

    // Route downloads into our folder instead of the profile default.
    let behavior = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(config.download_dir.to_string_lossy().into_owned())
        .build()
        .map_err(PortalError::Protocol)?;
    page.execute(behavior)
        .await
        .map_err(|e| PortalError::Protocol(e.to_string()))?;

    page.wait_for_navigation()
        .await
        .map_err(|e| PortalError::Protocol(e.to_string()))?;

    // The report list renders lazily; bring the controls into view first.
    page.evaluate("window.scrollTo(0, document.body.scrollHeight)")
        .await
        .map_err(|e| PortalError::Protocol(e.to_string()))?;

    let select_all = wait_for_element(&page, SELECT_ALL_SELECTOR, config.timeout).await?;
    select_all
        .click()
        .await
        .map_err(|e| PortalError::Protocol(e.to_string()))?;
    tracing::debug!("Selected all reports");

    let download = wait_for_element(&page, BULK_DOWNLOAD_SELECTOR, config.timeout).await?;
    download
        .click()
        .await
        .map_err(|e| PortalError::Protocol(e.to_string()))?;
    tracing::debug!("Triggered bulk download");

    // Give the download manager up to the settle period to finish writing.
    let deadline = tokio::time::Instant::now() + config.settle;
    let expected = config.expected_archive_path();
    while !expected.exists() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(DOWNLOAD_POLL_INTERVAL).await;
    }

    Ok(())
}

/// Drives the portal until the bulk archive materializes or the attempt
/// budget is exhausted. Attempt-level failures are logged and retried, never
/// propagated; the returned job's outcome is the only failure signal.
pub async fn retrieve(config: &PortalConfig, log: &mut RunLog) -> ArchiveJob {
    retrieve_with(config, log, run_browser_attempt).await
}

/// Retry loop behind `retrieve`, generic over the attempt body so tests can
/// substitute a stub for the browser.
pub async fn retrieve_with<'a, F, Fut>(
    config: &'a PortalConfig,
    log: &mut RunLog,
    mut attempt: F,
) -> ArchiveJob
where
    F: FnMut(&'a PortalConfig) -> Fut,
    Fut: Future<Output = Result<(), PortalError>>,
{
    let mut job = ArchiveJob::new(config);
    let expected = config.expected_archive_path();

    for attempt_no in 1..=config.max_attempts {
        job.attempts_made = attempt_no;
        log.success(format!(
            "Starting download attempt {}/{}...",
            attempt_no, config.max_attempts
        ));

        if let Err(e) = attempt(config).await {
            log.warning(format!("Attempt {} failed: {}", attempt_no, e));
            continue;
        }

        if expected.exists() {
            log.success(format!(
                "Found {} in {}",
                config.archive_name,
                config.download_dir.display()
            ));
            job.outcome = JobOutcome::Success(expected);
            return job;
        }

        log.warning(format!(
            "{} not found in {} after settle period",
            config.archive_name,
            config.download_dir.display()
        ));
    }

    log.error("All download attempts failed.");
    job.outcome = JobOutcome::Failed;
    job
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::LogOutcome;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_config(dir: &std::path::Path, max_attempts: u32) -> PortalConfig {
        PortalConfig {
            download_dir: dir.to_path_buf(),
            max_attempts,
            timeout: Duration::from_millis(50),
            settle: Duration::from_millis(0),
            ..PortalConfig::default()
        }
    }

    #[tokio::test]
    async fn retrieve_succeeds_once_archive_materializes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = test_config(dir.path(), 3);
        let archive = config.expected_archive_path();
        let calls = AtomicU32::new(0);
        let mut log = RunLog::new();

        // Attempts 1 and 2 produce nothing; attempt 3 writes the archive.
        let job = retrieve_with(&config, &mut log, |cfg| {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let path = cfg.expected_archive_path();
            async move {
                if call == 3 {
                    std::fs::write(&path, b"archive bytes").expect("write stub archive");
                }
                Ok(())
            }
        })
        .await;

        assert!(job.is_success());
        assert_eq!(job.attempts_made, 3);
        assert_eq!(job.archive_path(), Some(archive.as_path()));

        let attempt_lines = log
            .entries()
            .iter()
            .filter(|e| e.message.starts_with("Starting download attempt"))
            .count();
        assert_eq!(attempt_lines, 3);
    }

    #[tokio::test]
    async fn retrieve_fails_after_exactly_max_attempts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = test_config(dir.path(), 2);
        let calls = AtomicU32::new(0);
        let mut log = RunLog::new();

        let job = retrieve_with(&config, &mut log, |_cfg| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

        assert_eq!(job.outcome, JobOutcome::Failed);
        assert_eq!(job.attempts_made, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let attempt_lines = log
            .entries()
            .iter()
            .filter(|e| e.message.starts_with("Starting download attempt"))
            .count();
        assert_eq!(attempt_lines, 2);
    }

    #[tokio::test]
    async fn transient_attempt_errors_are_logged_not_propagated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = test_config(dir.path(), 2);
        let mut log = RunLog::new();

        let job = retrieve_with(&config, &mut log, |cfg| {
            let waited = cfg.timeout.as_secs();
            async move {
                Err(PortalError::ElementTimeout {
                    selector: SELECT_ALL_SELECTOR.to_string(),
                    waited_secs: waited,
                })
            }
        })
        .await;

        assert_eq!(job.outcome, JobOutcome::Failed);
        assert!(log
            .entries()
            .iter()
            .any(|e| e.outcome == LogOutcome::Warning));
    }
}
