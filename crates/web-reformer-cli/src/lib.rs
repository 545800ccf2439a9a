//! Web Reformer CLI: scripted multi-step web sessions over memoized response views.

pub mod config;
pub mod login;
pub mod report;
pub mod session;

pub use config::{resolve_session_config, SessionConfig};
pub use login::{run_login, Download, LoginOutcome, LoginPlan};
pub use report::InspectReport;
pub use session::WebSession;
