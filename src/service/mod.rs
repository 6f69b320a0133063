//! View controllers: the login/registration form and the catalog dashboard.

pub mod dashboard;
pub mod session;

pub use dashboard::{Dashboard, DashboardState};
pub use session::{FormMode, LoginForm, Session, SubmitOutcome};
