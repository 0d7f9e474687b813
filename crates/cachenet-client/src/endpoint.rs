//! REST endpoint paths.

use std::fmt;

/// Logs are fetched on demand and never polled.
pub const LOGS_PATH: &str = "/api/v1/logs";

/// Collections the console polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Deployment,
    Servers,
    Applications,
    ApplicationManagement,
    AvailableLogDates,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Self::Deployment,
        Self::Servers,
        Self::Applications,
        Self::ApplicationManagement,
        Self::AvailableLogDates,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Deployment => "/api/v1/deployment",
            Self::Servers => "/api/v1/servers",
            Self::Applications => "/api/v1/applications",
            Self::ApplicationManagement => "/api/v1/application_management",
            Self::AvailableLogDates => "/api/v1/available_log_dates",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
