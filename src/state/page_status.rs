/// Page status definitions for tracking crawl progress
///
/// A page moves `Pending -> Crawling -> {Completed, Failed}`. Returning to
/// `Pending` is an explicit reset performed by an operator or a higher layer.
use serde::Serialize;
use std::fmt;

/// Represents the crawl status of a page record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Registered and waiting to be crawled
    Pending,

    /// A fetch for this page is in flight
    Crawling,

    /// Fetched and extracted successfully
    Completed,

    /// The last fetch failed; see the page's error message
    Failed,
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: PageStatus,
    pub to: PageStatus,
}

impl PageStatus {
    /// Validates a status change and returns the new status
    ///
    /// Legal moves:
    /// - `Pending -> Crawling`
    /// - `Crawling -> Completed | Failed`
    /// - `Completed | Failed | Crawling -> Pending` (external reset)
    pub fn transition(self, to: PageStatus) -> Result<PageStatus, IllegalTransition> {
        use PageStatus::*;

        match (self, to) {
            (Pending, Crawling)
            | (Crawling, Completed)
            | (Crawling, Failed)
            | (Completed, Pending)
            | (Failed, Pending)
            | (Crawling, Pending) => Ok(to),
            _ => Err(IllegalTransition { from: self, to }),
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Crawling => "crawling",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "crawling" => Some(Self::Crawling),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all statuses in lifecycle order
    pub fn all() -> [Self; 4] {
        [Self::Pending, Self::Crawling, Self::Completed, Self::Failed]
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
