mod errors;
mod mailer;
mod metrics;
mod models;
mod repository;

pub mod scoring;

// Publicly expose the Metrics abstraction
pub use metrics::{Metrics, MetricsPtr};

// Publicly expose persistence and delivery abstractions
pub use mailer::{Mailer, MailerPtr};
pub use repository::{Repository, RepositoryPtr};

// Domain models and errors
pub use errors::{AuthError, ValidationError};
pub use models::{
    CheckRecord, Identity, MetricBaseline, PendingCredential, ReadinessFlag, ScoreBreakdown, User,
};
