//! Regex filters for hosts, services and status information.
//!
//! Users can hide entries they do not care about (flapping test hosts,
//! known-noisy services) by regular expression. Each filter can be
//! reversed to act as an allow-list instead.

use regex::Regex;
use serde::Deserialize;
use tracing::error;

/// Filter settings as they appear in the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub host: Option<PatternFilter>,
    #[serde(default)]
    pub service: Option<PatternFilter>,
    #[serde(default)]
    pub status_information: Option<PatternFilter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternFilter {
    pub pattern: String,
    /// When set, entries NOT matching the pattern are filtered out instead.
    #[serde(default)]
    pub reverse: bool,
}

#[derive(Debug)]
struct CompiledFilter {
    regex: Regex,
    reverse: bool,
}

impl CompiledFilter {
    /// An entry is filtered out when it matches the pattern (or fails to,
    /// for a reversed filter).
    fn filters_out(&self, text: &str) -> bool {
        self.regex.is_match(text) != self.reverse
    }
}

/// Compiled filter set, built once and shared by all pollers.
#[derive(Debug, Default)]
pub struct Filters {
    host: Option<CompiledFilter>,
    service: Option<CompiledFilter>,
    status_information: Option<CompiledFilter>,
}

impl Filters {
    /// Compile the configured patterns. An invalid pattern is logged and
    /// disabled rather than taking the whole filter set down.
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            host: compile(config.host.as_ref(), "host"),
            service: compile(config.service.as_ref(), "service"),
            status_information: compile(config.status_information.as_ref(), "status_information"),
        }
    }

    pub fn host_filtered_out(&self, host: &str) -> bool {
        self.host.as_ref().is_some_and(|f| f.filters_out(host))
    }

    pub fn service_filtered_out(&self, service: &str) -> bool {
        self.service.as_ref().is_some_and(|f| f.filters_out(service))
    }

    pub fn status_information_filtered_out(&self, status_information: &str) -> bool {
        self.status_information
            .as_ref()
            .is_some_and(|f| f.filters_out(status_information))
    }
}

fn compile(filter: Option<&PatternFilter>, which: &str) -> Option<CompiledFilter> {
    let filter = filter?;
    match Regex::new(&filter.pattern) {
        Ok(regex) => Some(CompiledFilter {
            regex,
            reverse: filter.reverse,
        }),
        Err(e) => {
            error!("invalid {which} filter pattern '{}': {e}", filter.pattern);
            None
        }
    }
}
