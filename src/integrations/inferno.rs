use crate::domain::calendar::InfernoEvent;
use crate::domain::calendar::driven_ports::EventSource;
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, bail};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Reads event descriptions from the Inferno events API
pub struct InfernoEventSource {
    pub base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InfernoEventBody {
    id: String,
    // Inferno sends null for text it has no value for
    name: Option<String>,
    description: Option<String>,
    client_id: Option<String>,
    pre_roll: DateTime<FixedOffset>,
    start_time: DateTime<FixedOffset>,
}

impl From<InfernoEventBody> for InfernoEvent {
    fn from(value: InfernoEventBody) -> Self {
        InfernoEvent {
            id: value.id,
            name: value.name.unwrap_or_default(),
            description: value.description.unwrap_or_default(),
            client_id: value.client_id.unwrap_or_default(),
            pre_roll: value.pre_roll,
            start_time: value.start_time,
        }
    }
}

impl EventSource for InfernoEventSource {
    #[tracing::instrument(skip(self, inferno_api_key, ext_cxn))]
    async fn fetch_event(
        &self,
        event_id: &str,
        inferno_api_key: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<InfernoEvent, anyhow::Error> {
        let url = super::endpoint(&self.base_url, &["api", "Events", event_id])?;

        let response = ext_cxn
            .http_client()
            .get(url)
            .bearer_auth(inferno_api_key)
            .send()
            .await
            .context("requesting an event from Inferno")?;
        if !response.status().is_success() {
            bail!(
                "Inferno could not provide event {event_id}: {}",
                super::failure_detail(response).await
            );
        }

        let body = response
            .bytes()
            .await
            .context("reading the Inferno event response")?;
        let event: InfernoEventBody =
            serde_json::from_slice(&body).context("parsing the Inferno event response")?;

        Ok(event.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external_connections;
    use speculoos::prelude::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_event_payload() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Events/evt-1"))
            .and(header("Authorization", "Bearer inferno-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "evt-1",
                "name": "Standup",
                "description": "daily sync",
                "clientId": "client-7",
                "preRoll": "2024-01-10T08:45:00-08:00",
                "startTime": "2024-01-10T09:00:00-08:00"
            })))
            .mount(&mock_server)
            .await;

        let source = InfernoEventSource {
            base_url: mock_server.uri(),
        };
        let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

        let event = source.fetch_event("evt-1", "inferno-key", &mut ext_cxn).await;
        assert_that!(event).is_ok().matches(|event| {
            event.name == "Standup"
                && event.client_id == "client-7"
                && event.start_time.to_rfc3339() == "2024-01-10T09:00:00-08:00"
        });
    }

    #[tokio::test]
    async fn null_text_fields_read_as_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Events/evt-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "evt-2",
                "name": null,
                "description": null,
                "clientId": null,
                "preRoll": "2024-01-10T08:45:00-08:00",
                "startTime": "2024-01-10T09:00:00-08:00"
            })))
            .mount(&mock_server)
            .await;

        let source = InfernoEventSource {
            base_url: mock_server.uri(),
        };
        let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

        let event = source.fetch_event("evt-2", "inferno-key", &mut ext_cxn).await;
        assert_that!(event).is_ok().matches(|event| {
            event.id == "evt-2"
                && event.name.is_empty()
                && event.description.is_empty()
                && event.client_id.is_empty()
        });
    }

    #[tokio::test]
    async fn missing_description_reads_as_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Events/evt-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "evt-3",
                "name": "Retro",
                "preRoll": "2024-01-10T08:45:00-08:00",
                "startTime": "2024-01-10T09:00:00-08:00"
            })))
            .mount(&mock_server)
            .await;

        let source = InfernoEventSource {
            base_url: mock_server.uri(),
        };
        let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

        let event = source.fetch_event("evt-3", "inferno-key", &mut ext_cxn).await;
        assert_that!(event)
            .is_ok()
            .matches(|event| event.name == "Retro" && event.description.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Events/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such event"))
            .mount(&mock_server)
            .await;

        let source = InfernoEventSource {
            base_url: mock_server.uri(),
        };
        let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

        let event = source.fetch_event("missing", "inferno-key", &mut ext_cxn).await;
        assert_that!(event)
            .is_err()
            .matches(|err| err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/Events/evt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&mock_server)
            .await;

        let source = InfernoEventSource {
            base_url: mock_server.uri(),
        };
        let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

        let event = source.fetch_event("evt-1", "inferno-key", &mut ext_cxn).await;
        assert_that!(event).is_err();
    }

    mod falls_back_to_default_event {
        use super::*;
        use crate::domain::calendar::test_util::caller_profile;
        use crate::domain::calendar::{
            BodyType, FetchedEvent, StandardTimeZoneNames, fetch_event, prepare_event,
        };

        fn assert_is_lunch_invitation(fetched: &FetchedEvent) {
            assert_eq!(&FetchedEvent::Unavailable, fetched);

            let prepared = prepare_event(fetched, &caller_profile(), &StandardTimeZoneNames::default());
            assert_eq!("Pacific Standard Time", prepared.time_zone);
            assert_eq!("Let's go for lunch", prepared.event.subject);
            assert_eq!(BodyType::Html, prepared.event.body.content_type);
            assert_eq!("Does noon work for you?", prepared.event.body.content);
            assert_eq!("2021-03-30T10:00:00", prepared.event.start.date_time);
            assert_eq!("2021-03-30T11:00:00", prepared.event.end.date_time);
            assert_eq!("Pacific Standard Time", prepared.event.start.time_zone);
            assert_eq!("Pacific Standard Time", prepared.event.end.time_zone);
        }

        #[tokio::test]
        async fn when_inferno_fails() {
            let mock_server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/api/Events/evt-1"))
                .respond_with(ResponseTemplate::new(503))
                .mount(&mock_server)
                .await;
            let source = InfernoEventSource {
                base_url: mock_server.uri(),
            };
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let fetched = fetch_event("evt-1", "inferno-key", &mut ext_cxn, &source).await;
            assert_is_lunch_invitation(&fetched);
        }

        #[tokio::test]
        async fn when_inferno_is_unreachable() {
            let closed_address = {
                let listener = std::net::TcpListener::bind("127.0.0.1:0")
                    .expect("could not reserve a local port");
                listener.local_addr().expect("listener has no address")
            };
            let source = InfernoEventSource {
                base_url: format!("http://{closed_address}"),
            };
            let mut ext_cxn = external_connections::test_util::FakeExternalConnectivity::new();

            let fetched = fetch_event("evt-1", "inferno-key", &mut ext_cxn, &source).await;
            assert_is_lunch_invitation(&fetched);
        }
    }
}
