//! Per-origin robots.txt cache
//!
//! Each origin's robots.txt is fetched once per run, the first time a URL on
//! that origin is about to be fetched.

use crate::robots::ParsedRobots;
use reqwest::Client;
use std::collections::HashMap;
use url::Url;

/// Robots.txt policies keyed by origin (`scheme://host:port`)
pub struct RobotsCache {
    client: Client,

    /// Product token matched against `User-agent` lines
    agent: String,

    entries: HashMap<String, ParsedRobots>,
}

impl RobotsCache {
    pub fn new(client: Client, agent: impl Into<String>) -> Self {
        Self {
            client,
            agent: agent.into(),
            entries: HashMap::new(),
        }
    }

    /// Returns the policy for the URL's origin, fetching it on first use
    pub async fn policy_for(&mut self, url: &Url) -> &ParsedRobots {
        let origin = url.origin().ascii_serialization();

        if !self.entries.contains_key(&origin) {
            let policy = self.fetch(&origin).await;
            self.entries.insert(origin.clone(), policy);
        }

        // Inserted above when missing
        self.entries
            .entry(origin)
            .or_insert_with(ParsedRobots::allow_all)
    }

    /// Checks whether the crawler may fetch `url`
    pub async fn is_allowed(&mut self, url: &Url) -> bool {
        let agent = self.agent.clone();
        self.policy_for(url).await.is_allowed(url.as_str(), &agent)
    }

    /// Returns the `Crawl-delay` that applies to the crawler on this origin
    pub async fn crawl_delay(&mut self, url: &Url) -> Option<std::time::Duration> {
        let agent = self.agent.clone();
        self.policy_for(url).await.crawl_delay(&agent)
    }

    /// Number of origins with a cached policy
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Downloads and parses `{origin}/robots.txt`
    ///
    /// Missing files and fetch errors both mean "allow all".
    async fn fetch(&self, origin: &str) -> ParsedRobots {
        let robots_url = format!("{}/robots.txt", origin);

        let response = match self.client.get(&robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Could not fetch {}: {}; allowing all", robots_url, e);
                return ParsedRobots::allow_all();
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} returned {}; allowing all", robots_url, status);
            return ParsedRobots::allow_all();
        }

        match response.text().await {
            Ok(body) => {
                tracing::debug!("Loaded {} ({} bytes)", robots_url, body.len());
                ParsedRobots::from_content(&body)
            }
            Err(e) => {
                tracing::warn!("Could not read {}: {}; allowing all", robots_url, e);
                ParsedRobots::allow_all()
            }
        }
    }
}
