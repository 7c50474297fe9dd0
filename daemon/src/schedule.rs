use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::tagger::Label;

/// Planned date per trade, loaded from a `trade,date` CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    planned: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    trade: String,
    date: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("failed to read schedule {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },
}

impl Schedule {
    pub fn load(path: &Path) -> Result<Self, ScheduleError> {
        let file = std::fs::File::open(path).map_err(|e| ScheduleError::Read {
            path: path.display().to_string(),
            source: e.into(),
        })?;
        let schedule = Self::from_reader(file).map_err(|e| ScheduleError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        info!(path = %path.display(), trades = schedule.len(), "loaded schedule");
        Ok(schedule)
    }

    /// Parse CSV with a header row naming at least `trade` and `date`.
    /// Later rows for the same trade replace earlier ones.
    pub fn from_reader<R: std::io::Read>(rdr: R) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
        let mut planned = HashMap::new();
        for row in reader.deserialize() {
            let row: ScheduleRow = row?;
            planned.insert(row.trade, row.date);
        }
        Ok(Self { planned })
    }

    pub fn len(&self) -> usize {
        self.planned.len()
    }

    /// Planned date for `trade`. A blank date counts as unscheduled.
    pub fn planned(&self, trade: &str) -> Option<&str> {
        self.planned
            .get(trade)
            .map(String::as_str)
            .filter(|date| !date.is_empty())
    }

    /// One warning per scheduled trade seen in `labels`, in first-seen order.
    pub fn compare_progress(&self, labels: &[Label]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut warnings = Vec::new();
        for label in labels {
            let Some(planned) = self.planned(&label.trade) else {
                continue;
            };
            if seen.insert(label.trade.as_str()) {
                debug!(trade = %label.trade, planned, "tagged trade is on the schedule");
                warnings.push(format!("{} expected {planned}, found in images", label.trade));
            }
        }
        warnings
    }
}
