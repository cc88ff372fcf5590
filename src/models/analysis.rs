//! Single-page analysis record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of headings found per level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingCounts {
    pub h1: u32,
    pub h2: u32,
    pub h3: u32,
    pub h4: u32,
    pub h5: u32,
    pub h6: u32,
}

impl HeadingCounts {
    /// Counts one heading of the given level; levels outside 1..=6 are ignored
    pub fn increment(&mut self, level: u8) {
        if let Some(slot) = self.slot_mut(level) {
            *slot += 1;
        }
    }

    /// Count for a level, 0 for levels outside 1..=6
    pub fn get(&self, level: u8) -> u32 {
        match level {
            1 => self.h1,
            2 => self.h2,
            3 => self.h3,
            4 => self.h4,
            5 => self.h5,
            6 => self.h6,
            _ => 0,
        }
    }

    pub fn total(&self) -> u32 {
        (1..=6).map(|level| self.get(level)).sum()
    }

    fn slot_mut(&mut self, level: u8) -> Option<&mut u32> {
        match level {
            1 => Some(&mut self.h1),
            2 => Some(&mut self.h2),
            3 => Some(&mut self.h3),
            4 => Some(&mut self.h4),
            5 => Some(&mut self.h5),
            6 => Some(&mut self.h6),
            _ => None,
        }
    }
}

/// Reachability tally for one link class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStatus {
    /// Unique links of this class
    pub count: usize,

    /// Links whose probe failed or returned a non 2xx/3xx status
    pub inaccessible: usize,

    /// Links that were never probed
    #[serde(default)]
    pub unchecked: usize,
}

impl LinkStatus {
    /// Links known to be reachable
    pub fn accessible(&self) -> usize {
        self.count.saturating_sub(self.inaccessible + self.unchecked)
    }
}

/// Result of analyzing one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Storage identifier, assigned on save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Analyzed URL after input normalization
    pub url: String,

    pub html_version: String,
    pub title: String,
    pub headings: HeadingCounts,
    pub internal_links: LinkStatus,
    pub external_links: LinkStatus,
    pub has_login_form: bool,

    /// Principal that requested the analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Host of the analyzed URL, if it parses
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}
