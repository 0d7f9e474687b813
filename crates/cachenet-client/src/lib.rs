//! cachenet-client: REST client for the cachenet control API.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET/POST/DELETE/PUT | `/api/v1/deployment` | List, add, remove, retry nodes |
//! | GET/POST/PUT/DELETE | `/api/v1/servers` | Server provisioning |
//! | GET/POST/DELETE | `/api/v1/applications` | Application catalogue |
//! | GET/POST/DELETE | `/api/v1/application_management` | Install / uninstall batches |
//! | GET | `/api/v1/available_log_dates` | Log dates per node |
//! | GET | `/api/v1/logs` | Log entries |
//!
//! Callers depend on the [`ConsoleApi`] trait; [`HttpConsoleApi`] is the
//! production implementation.

pub mod api;
pub mod endpoint;
pub mod error;
pub mod forms;
pub mod http;

pub use api::{ConsoleApi, LogLevel, LogQuery, NodeLogDates};
pub use endpoint::Endpoint;
pub use error::{ApiError, ApiResult, FormError};
pub use forms::{ApplicationForm, ServerAuth, ServerForm};
pub use http::HttpConsoleApi;
