use std::time::Duration;

use anyhow::{Result, bail};
use reqwest::header::HeaderValue;
use reqwest::{Client, header};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
const APPLICATION_LD_JSON: HeaderValue = HeaderValue::from_static(
    "application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\"",
);

#[derive(Clone)]
pub(crate) struct Mailman {
    client: Client,
}

impl Mailman {
    pub(crate) fn new(timeout: Duration) -> Result<Mailman> {
        let client = Client::builder()
            .http1_only()
            .user_agent(APP_USER_AGENT)
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(Mailman { client })
    }

    pub(crate) async fn post(&self, inbox: &str, body: &str) -> Result<()> {
        let response = self
            .client
            .post(inbox)
            .header(header::CONTENT_TYPE, APPLICATION_LD_JSON)
            .body(body.to_string())
            .send()
            .await?;
        if response.error_for_status_ref().is_err() {
            let code = response.status();
            let text = response.text().await?;
            bail!("posting to {inbox} failed with error {code} {text}");
        }
        Ok(())
    }
}
