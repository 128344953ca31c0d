//! Polling of the sentinel file written once a remote archive unpack finishes.

use reqwest::{Client, StatusCode};
use staticpub_protocol::constants::SENTINEL_SUCCESS_VALUE;
use tracing::debug;

use crate::SentinelError;
use crate::abort::AbortSignal;
use crate::retry::{Attempt, PollPolicy};

/// Waits for the remote unpack step to report its outcome.
#[derive(Debug, Clone)]
pub struct SentinelPoller {
    client: Client,
    policy: PollPolicy,
}

impl SentinelPoller {
    pub fn new(client: Client, policy: PollPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Polls `url` until its body reads `"OK"`.
    ///
    /// A 403 means the signed URL expired and ends polling at once, as does
    /// any readable body other than the success token. Every other failure
    /// counts as one poll; when the budget runs out the last
    /// [`SentinelError::Unavailable`] is returned.
    pub async fn wait_for_unpack(
        &self,
        url: &str,
        abort: &AbortSignal,
    ) -> Result<(), SentinelError> {
        debug!(url, "waiting for unpack sentinel");

        self.policy
            .run(abort, |attempt| self.poll_once(url, attempt, abort))
            .await?;

        debug!(url, "sentinel present, continuing");
        Ok(())
    }

    async fn poll_once(
        &self,
        url: &str,
        attempt: u32,
        abort: &AbortSignal,
    ) -> Result<(), Attempt<SentinelError>> {
        let request = self.client.get(url).send();
        let response = tokio::select! {
            biased;
            _ = abort.aborted() => {
                return Err(Attempt::Bail(SentinelError::Aborted(abort.reason())));
            }
            response = request => response,
        };

        let response = response
            .map_err(|e| Attempt::Retry(SentinelError::Unavailable(e.to_string())))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(Attempt::Bail(SentinelError::ExpiredSignature));
        }
        if !status.is_success() {
            debug!(attempt, %status, "sentinel not ready");
            return Err(Attempt::Retry(SentinelError::Unavailable(format!(
                "server responded with {status}"
            ))));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Attempt::Retry(SentinelError::Unavailable(e.to_string())))?;

        if body != SENTINEL_SUCCESS_VALUE {
            return Err(Attempt::Bail(SentinelError::UnpackFailed(body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn poller(max_attempts: u32) -> SentinelPoller {
        SentinelPoller::new(
            Client::new(),
            PollPolicy {
                interval: Duration::from_millis(1),
                max_attempts,
            },
        )
    }

    async fn sentinel_server() -> (MockServer, String) {
        let server = MockServer::start().await;
        let url = format!("{}/sentinels/build-1.txt", server.uri());
        (server, url)
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.unwrap().len()
    }

    #[tokio::test]
    async fn ok_body_ends_polling() {
        let (server, url) = sentinel_server().await;
        Mock::given(method("GET"))
            .and(path("/sentinels/build-1.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&server)
            .await;

        poller(5).wait_for_unpack(&url, &AbortSignal::new()).await.unwrap();
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn error_body_fails_without_retry() {
        let (server, url) = sentinel_server().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ERROR"))
            .mount(&server)
            .await;

        let err = poller(5)
            .wait_for_unpack(&url, &AbortSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::UnpackFailed(ref b) if b == "ERROR"));
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn empty_body_is_an_unpack_failure() {
        let (server, url) = sentinel_server().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let err = poller(5)
            .wait_for_unpack(&url, &AbortSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::UnpackFailed(ref b) if b.is_empty()));
    }

    #[tokio::test]
    async fn token_match_is_exact() {
        let (server, url) = sentinel_server().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK\n"))
            .mount(&server)
            .await;

        let err = poller(5)
            .wait_for_unpack(&url, &AbortSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::UnpackFailed(_)));
    }

    #[tokio::test]
    async fn forbidden_is_expired_signature_and_never_retried() {
        let (server, url) = sentinel_server().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = poller(185)
            .wait_for_unpack(&url, &AbortSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::ExpiredSignature));
        assert_eq!(request_count(&server).await, 1);
    }

    #[tokio::test]
    async fn succeeds_on_fortieth_of_185_attempts() {
        let (server, url) = sentinel_server().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(39)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&server)
            .await;

        let poller = poller(185);
        let start = Instant::now();
        poller.wait_for_unpack(&url, &AbortSignal::new()).await.unwrap();

        assert_eq!(request_count(&server).await, 40);
        assert!(start.elapsed() >= poller.policy().interval * 39);
    }

    #[tokio::test]
    async fn missing_sentinel_exhausts_poll_budget() {
        let (server, url) = sentinel_server().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = poller(6)
            .wait_for_unpack(&url, &AbortSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::Unavailable(_)));
        assert_eq!(request_count(&server).await, 6);
    }

    #[tokio::test]
    async fn abort_interrupts_in_flight_poll() {
        let (server, url) = sentinel_server().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("OK")
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let abort = AbortSignal::new();
        let trigger = abort.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.abort_with("stop");
        });

        let start = Instant::now();
        let err = poller(185).wait_for_unpack(&url, &abort).await.unwrap_err();

        assert!(matches!(err, SentinelError::Aborted(ref r) if r == "stop"));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn aborted_before_polling_makes_no_request() {
        let (server, url) = sentinel_server().await;
        let abort = AbortSignal::new();
        abort.abort();

        let err = poller(5).wait_for_unpack(&url, &abort).await.unwrap_err();
        assert!(matches!(err, SentinelError::Aborted(ref r) if r == "aborted"));
        assert_eq!(request_count(&server).await, 0);
    }
}
