//! HTTP fallback host.
//!
//! Used when no desktop host is attached. Commands map to JSON POST
//! endpoints; events are polled from `GET /api/events?after={cursor}` and
//! forwarded to the subscription in the order the server lists them.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{ProcessHost, RawHostEvent, RunScriptArgs, Subscription};
use crate::config::HostConfig;
use crate::errors::HostError;
use crate::run::types::RunId;

#[derive(Debug, Deserialize)]
struct RunScriptResponse {
    run_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct EventsPage {
    #[serde(default)]
    cursor: u64,
    #[serde(default)]
    events: Vec<RawHostEvent>,
}

#[derive(Debug, Clone)]
pub struct HttpHost {
    client: Client,
    base_url: String,
    poll_interval: Duration,
}

impl HttpHost {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, HostError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval,
        })
    }

    pub fn from_config(config: &HostConfig) -> Result<Self, HostError> {
        Self::new(
            config.url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_millis(config.poll_interval_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/api/{}", self.base_url, name)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        name: &str,
        body: &B,
    ) -> Result<Response, HostError> {
        let response = self.client.post(self.endpoint(name)).json(body).send().await?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, HostError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HostError::Http {
        status: status.as_u16(),
        body,
    })
}

async fn fetch_events(client: &Client, url: &str, cursor: u64) -> Result<EventsPage, HostError> {
    let response = client.get(url).query(&[("after", cursor)]).send().await?;
    let response = check_status(response).await?;
    let page = response.json::<EventsPage>().await?;
    // A page that delivers events must move the cursor, or the next poll replays them.
    if !page.events.is_empty() && page.cursor <= cursor {
        return Err(HostError::Decode(format!(
            "events page did not advance cursor past {}",
            cursor
        )));
    }
    Ok(page)
}

async fn poll_events(
    client: Client,
    url: String,
    interval: Duration,
    tx: mpsc::UnboundedSender<RawHostEvent>,
) {
    let mut cursor = 0;
    let mut failing = false;
    loop {
        match fetch_events(&client, &url, cursor).await {
            Ok(page) => {
                if failing {
                    info!("event polling recovered");
                    failing = false;
                }
                for event in page.events {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                cursor = cursor.max(page.cursor);
            }
            Err(e) if !failing => {
                warn!(error = %e, "event polling failed");
                failing = true;
            }
            Err(e) => debug!(error = %e, "event polling still failing"),
        }
        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

#[async_trait]
impl ProcessHost for HttpHost {
    async fn run_script(&self, args: &RunScriptArgs) -> Result<RunId, HostError> {
        let response = self.post_json("run-script", args).await?;
        let body: RunScriptResponse = response.json().await?;
        Ok(RunId::new(body.run_id))
    }

    async fn stop_script(&self) -> Result<(), HostError> {
        self.post_json("stop-script", &json!({})).await?;
        Ok(())
    }

    async fn stop_run(&self, run_id: &RunId) -> Result<(), HostError> {
        self.post_json("stop-run", &json!({ "run_id": run_id.as_str() }))
            .await?;
        Ok(())
    }

    /// Starts a polling task for this subscription; must be called inside a
    /// Tokio runtime. Unsubscribing aborts the task.
    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(poll_events(
            self.client.clone(),
            self.endpoint("events"),
            self.poll_interval,
            tx,
        ));
        Subscription::new(rx, move || task.abort())
    }
}
