//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate; the
//! `Crawl-delay` extension, which that crate ignores, is read here.

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Longest `Crawl-delay` honoured; larger values are clamped to this
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(3600);

/// A `User-agent` group and the crawl delay it declares
#[derive(Debug, Clone, Default)]
struct AgentGroup {
    agents: Vec<String>,
    crawl_delay: Option<f64>,
}

/// Parsed robots.txt data for one origin
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,

    groups: Vec<AgentGroup>,
}

impl ParsedRobots {
    /// Parses raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            groups: parse_groups(content),
        }
    }

    /// A policy that allows everything
    ///
    /// Used when an origin has no robots.txt or it cannot be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - An absolute URL or a path such as "/page.html"
    /// * `agent` - The crawler's product token (e.g. "SumiHarvest")
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, agent, url)
    }

    /// Gets the crawl delay that applies to `agent`
    ///
    /// A group naming the agent wins over the `*` group. Negative or
    /// non-numeric values are ignored and anything above
    /// `MAX_CRAWL_DELAY` is clamped to it.
    pub fn crawl_delay(&self, agent: &str) -> Option<Duration> {
        let agent = agent.to_lowercase();

        let specific = self.groups.iter().find(|group| {
            group
                .agents
                .iter()
                .any(|ua| ua != "*" && agent.contains(ua.as_str()))
        });
        let wildcard = self
            .groups
            .iter()
            .find(|group| group.agents.iter().any(|ua| ua == "*"));

        specific
            .or(wildcard)
            .and_then(|group| group.crawl_delay)
            .filter(|seconds| !seconds.is_nan() && *seconds >= 0.0)
            .map(|seconds| {
                Duration::try_from_secs_f64(seconds)
                    .unwrap_or(MAX_CRAWL_DELAY)
                    .min(MAX_CRAWL_DELAY)
            })
    }
}

/// Splits robots.txt into user-agent groups
///
/// Consecutive `User-agent` lines share a group; the first other directive
/// closes the list of agents, and the next `User-agent` line opens a new group.
fn parse_groups(content: &str) -> Vec<AgentGroup> {
    let mut groups: Vec<AgentGroup> = Vec::new();
    let mut collecting_agents = false;

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if !collecting_agents {
                    groups.push(AgentGroup::default());
                    collecting_agents = true;
                }
                if let Some(group) = groups.last_mut() {
                    group.agents.push(value.to_lowercase());
                }
            }
            "crawl-delay" => {
                collecting_agents = false;
                if let (Some(group), Ok(delay)) = (groups.last_mut(), value.parse::<f64>()) {
                    group.crawl_delay = Some(delay);
                }
            }
            _ => collecting_agents = false,
        }
    }

    groups
}
