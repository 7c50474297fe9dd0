use std::path::Path;
use tracing::info;

/// How a finished report would leave the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Upload,
    Email,
}

/// Hand the report to the project-management system. Upload is not wired up
/// yet; this only records what would happen.
pub fn push_report(report: &Path, token: Option<&str>) -> Delivery {
    match token.filter(|t| !t.is_empty()) {
        Some(_) => {
            info!(report = %report.display(), "would upload report to project management");
            Delivery::Upload
        }
        None => {
            info!(report = %report.display(), "no push token, emailing report (not implemented)");
            Delivery::Email
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_selects_upload() {
        assert_eq!(push_report(Path::new("logs/daily_log.pdf"), Some("bt")), Delivery::Upload);
    }

    #[test]
    fn missing_or_empty_token_selects_email() {
        assert_eq!(push_report(Path::new("logs/daily_log.pdf"), None), Delivery::Email);
        assert_eq!(push_report(Path::new("logs/daily_log.pdf"), Some("")), Delivery::Email);
    }
}
