//! Push-gateway channel: HTTP POST of an exposition body.

use std::time::Duration;

use thiserror::Error;
use ttp_config::ChannelKind;
use ttp_config::defaults::METRIC_PREFIX;
use url::Url;

use super::{ChannelPublisher, ChannelSettings, PublishStatus, log_outcome, precheck};
use crate::exposition::{LabelPlacement, render};
use crate::metric::Metric;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// The request never produced an HTTP status.
#[derive(Debug, Error)]
#[error("push gateway request failed: {message}")]
pub struct TransportFailure {
    pub message: String,
}

/// Synchronous HTTP POST.
pub trait HttpTransport {
    /// Posts `body` to `url`, returning the response status code.
    fn post(&self, url: &Url, body: &str) -> Result<u16, TransportFailure>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn post(&self, url: &Url, body: &str) -> Result<u16, TransportFailure> {
        (**self).post(url, body)
    }
}

/// [`HttpTransport`] backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }
}

impl HttpTransport for UreqTransport {
    fn post(&self, url: &Url, body: &str) -> Result<u16, TransportFailure> {
        match self
            .agent
            .post(url.as_str())
            .set("Content-Type", EXPOSITION_CONTENT_TYPE)
            .send_string(body)
        {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(code, _)) => Ok(code),
            Err(error) => Err(TransportFailure {
                message: error.to_string(),
            }),
        }
    }
}

/// Publishes metrics to a Prometheus push gateway.
pub struct PushGatewayPublisher<'a, T = UreqTransport> {
    settings: &'a ChannelSettings,
    transport: T,
}

impl<'a> PushGatewayPublisher<'a, UreqTransport> {
    #[must_use]
    pub fn new(settings: &'a ChannelSettings) -> Self {
        Self::with_transport(settings, UreqTransport::default())
    }
}

impl<'a, T: HttpTransport> PushGatewayPublisher<'a, T> {
    #[must_use]
    pub fn with_transport(settings: &'a ChannelSettings, transport: T) -> Self {
        Self {
            settings,
            transport,
        }
    }
}

/// Appends one `/name/value` segment pair per label to `base`.
#[must_use]
pub(crate) fn label_url(base: &Url, metric: &Metric) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty();
        for label in metric.labels() {
            segments.push(label.name()).push(label.value());
        }
    }
    url
}

impl<T: HttpTransport> ChannelPublisher for PushGatewayPublisher<'_, T> {
    fn kind(&self) -> ChannelKind {
        ChannelKind::PushGateway
    }

    fn publish(&self, metric: &Metric, caller_prefix: &str) -> PublishStatus {
        let name = metric.prefixed_name(caller_prefix, METRIC_PREFIX);
        let checked = precheck(self.settings, ChannelKind::PushGateway, metric, true);
        let status = match (checked, self.settings.pushgateway_url.as_ref()) {
            (Err(status), _) => status,
            (Ok(None), _) => PublishStatus::ValueUnsuited,
            (Ok(Some(_)), None) => PublishStatus::NoUrl,
            (Ok(Some(value)), Some(base)) => {
                let url = label_url(base, metric);
                let body = render(&name, metric, value, LabelPlacement::Omitted);
                if self.settings.dry_run {
                    tracing::info!(target: super::PUBLISH_TARGET, url = %url, "dry run; request skipped");
                    PublishStatus::Published
                } else {
                    match self.transport.post(&url, &body) {
                        Ok(code) if (200..300).contains(&code) => PublishStatus::Published,
                        Ok(code) => {
                            tracing::warn!(target: super::PUBLISH_TARGET, url = %url, code, "push gateway refused metric");
                            PublishStatus::RequestError
                        }
                        Err(error) => {
                            tracing::warn!(target: super::PUBLISH_TARGET, url = %url, error = %error, "push gateway unreachable");
                            PublishStatus::RequestError
                        }
                    }
                }
            }
        };
        log_outcome(ChannelKind::PushGateway, &name, status);
        status
    }
}

#[cfg(test)]
mod tests {
    use mockall::mock;
    use rstest::rstest;

    use super::*;
    use crate::metric::MetricType;
    use crate::publish::test_support::settings;

    mock! {
        Transport {}
        impl HttpTransport for Transport {
            fn post(&self, url: &Url, body: &str) -> Result<u16, TransportFailure>;
        }
    }

    fn gauge(value: &str) -> Metric {
        Metric::builder()
            .name("uptime")
            .help("seconds since start")
            .kind(MetricType::Gauge)
            .value(value)
            .labels(["daemon=backup", "env=prod"])
            .build()
            .expect("build")
    }

    #[test]
    fn appends_label_segments() {
        let settings = settings();
        let base = settings.pushgateway_url.as_ref().expect("url");
        assert_eq!(
            label_url(base, &gauge("1")).as_str(),
            "http://gateway:9091/metrics/job/ttp/daemon/backup/env/prod"
        );
    }

    #[test]
    fn posts_exposition_body() {
        let settings = settings();
        let mut transport = MockTransport::new();
        transport
            .expect_post()
            .withf(|url: &Url, body: &str| {
                url.path().ends_with("/daemon/backup/env/prod")
                    && body
                        == "# TYPE ttp_uptime gauge\n# HELP ttp_uptime seconds since start\nttp_uptime 7\n"
            })
            .times(1)
            .returning(|_, _| Ok(202));
        let publisher = PushGatewayPublisher::with_transport(&settings, transport);
        assert_eq!(publisher.publish(&gauge("7"), ""), PublishStatus::Published);
    }

    #[test]
    fn text_value_never_reaches_the_network() {
        let settings = settings();
        let mut transport = MockTransport::new();
        transport.expect_post().times(0);
        let publisher = PushGatewayPublisher::with_transport(&settings, transport);
        assert_eq!(
            publisher.publish(&gauge("running"), ""),
            PublishStatus::ValueUnsuited
        );
    }

    #[rstest]
    #[case::server_error(Ok(500))]
    #[case::not_found(Ok(404))]
    #[case::unreachable(Err(TransportFailure { message: "refused".into() }))]
    fn failed_requests_are_reported(#[case] outcome: Result<u16, TransportFailure>) {
        let settings = settings();
        let mut transport = MockTransport::new();
        let mut outcome = Some(outcome);
        transport
            .expect_post()
            .times(1)
            .returning(move |_, _| outcome.take().expect("single call"));
        let publisher = PushGatewayPublisher::with_transport(&settings, transport);
        assert_eq!(publisher.publish(&gauge("1"), ""), PublishStatus::RequestError);
    }

    #[test]
    fn dry_run_skips_request() {
        let mut settings = settings();
        settings.dry_run = true;
        let mut transport = MockTransport::new();
        transport.expect_post().never();
        let publisher = PushGatewayPublisher::with_transport(&settings, transport);
        assert_eq!(publisher.publish(&gauge("1"), ""), PublishStatus::Published);
    }

    #[test]
    fn missing_url_is_reported() {
        let mut settings = settings();
        settings.pushgateway_url = None;
        let publisher = PushGatewayPublisher::with_transport(&settings, MockTransport::new());
        assert_eq!(publisher.publish(&gauge("1"), ""), PublishStatus::NoUrl);
    }
}
