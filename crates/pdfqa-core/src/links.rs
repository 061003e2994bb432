//! Link checking
//!
//! Internal links are validated against the [`DestinationIndex`]; external
//! http(s) links are probed through a [`LinkProbe`]. A broken link is a
//! finding, never a fault: every annotation is checked independently and
//! probe failures come back as values.

use crate::destinations::DestinationIndex;
use crate::document::{Annotation, Destination, LinkTarget};
use crate::error::{AnalyzerError, Result};
use crate::issue::{Issue, IssueType};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use reqwest::Url;
use std::time::Duration;

const MAX_REDIRECTS: usize = 10;

/// Result of probing one URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Final response (after redirects) below 400
    Reachable(u16),
    /// Final response 400 or above
    HttpError(u16),
    /// No response within the timeout
    Timeout(Duration),
    /// DNS failure, refused connection, TLS error, ...
    Transport(String),
}

impl ProbeOutcome {
    pub fn is_broken(&self) -> bool {
        !matches!(self, ProbeOutcome::Reachable(_))
    }

    /// Timeouts and transport failures may be transient; HTTP statuses are not
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProbeOutcome::Timeout(_) | ProbeOutcome::Transport(_))
    }

    pub fn describe(&self) -> String {
        match self {
            ProbeOutcome::Reachable(status) => format!("HTTP {}", status),
            ProbeOutcome::HttpError(status) => format!("HTTP {}", status),
            ProbeOutcome::Timeout(after) => {
                format!("Request timed out after {}s", after.as_secs_f64())
            }
            ProbeOutcome::Transport(reason) => reason.clone(),
        }
    }
}

/// Something that can tell whether a URI responds
pub trait LinkProbe {
    fn probe(&self, uri: &str) -> ProbeOutcome;
}

/// HEAD-request probe over a blocking HTTP client
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("pdfqa/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalyzerError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, timeout })
    }
}

impl LinkProbe for HttpProbe {
    fn probe(&self, uri: &str) -> ProbeOutcome {
        match self.client.head(uri).send() {
            Ok(response) => {
                let status = response.status().as_u16();
                if status >= 400 {
                    ProbeOutcome::HttpError(status)
                } else {
                    ProbeOutcome::Reachable(status)
                }
            }
            Err(e) if e.is_timeout() => ProbeOutcome::Timeout(self.timeout),
            Err(e) => ProbeOutcome::Transport(e.to_string()),
        }
    }
}

/// Only http and https targets are probed
pub fn is_web_uri(uri: &str) -> bool {
    Url::parse(uri)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Checks the link annotations of one page at a time
pub struct LinkChecker<'a> {
    index: &'a DestinationIndex,
    probe: Option<&'a dyn LinkProbe>,
    retries: u32,
}

impl<'a> LinkChecker<'a> {
    /// Internal links only
    pub fn new(index: &'a DestinationIndex) -> Self {
        Self {
            index,
            probe: None,
            retries: 0,
        }
    }

    /// Also probe external links, retrying transient failures `retries` times
    pub fn with_probe(mut self, probe: &'a dyn LinkProbe, retries: u32) -> Self {
        self.probe = Some(probe);
        self.retries = retries;
        self
    }

    pub fn check_page(&self, annotations: &[Annotation], page: u32) -> Vec<Issue> {
        annotations
            .iter()
            .filter(|a| a.is_link())
            .filter_map(|a| match a.target.as_ref()? {
                LinkTarget::Internal(dest) => self.check_internal(dest, page),
                LinkTarget::External(uri) => self.check_external(uri, page),
            })
            .collect()
    }

    pub fn check_internal(&self, dest: &Destination, page: u32) -> Option<Issue> {
        match dest {
            Destination::Named(name) if !self.index.contains(name) => Some(Issue::new(
                page,
                IssueType::BrokenInternalLink,
                name.as_str(),
                "Named destination not found",
            )),
            Destination::Named(_) | Destination::Explicit => None,
        }
    }

    pub fn check_external(&self, uri: &str, page: u32) -> Option<Issue> {
        let probe = self.probe?;
        if !is_web_uri(uri) {
            tracing::debug!("Skipping non-web link on page {}: {}", page, uri);
            return None;
        }

        let mut outcome = probe.probe(uri);
        let mut attempt = 0;
        while outcome.is_retryable() && attempt < self.retries {
            attempt += 1;
            tracing::debug!("Retrying {} (attempt {}): {}", uri, attempt + 1, outcome.describe());
            outcome = probe.probe(uri);
        }

        if !outcome.is_broken() {
            return None;
        }

        tracing::warn!("Broken external link on page {}: {} ({})", page, uri, outcome.describe());
        Some(Issue::new(
            page,
            IssueType::BrokenExternalLink,
            uri,
            outcome.describe(),
        ))
    }
}
