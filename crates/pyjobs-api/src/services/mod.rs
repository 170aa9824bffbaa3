//! Business logic behind the handlers.

pub mod export;
pub mod feed;
pub mod lifecycle;
pub mod listing;
pub mod notifier;

pub use export::{applicants_csv, APPLICANT_CSV_HEADER};
pub use feed::{build_feed, FeedKind, FEED_LIMIT};
pub use lifecycle::{
    ApplicationLifecycle, ApplicationReview, ApplyEligibility, CloseOutcome, LifecycleError, LifecycleResult,
};
pub use listing::{paginate, PageMode};
pub use notifier::{LogNotifier, Notification, Notifier, NotifyError, WebhookNotifier};
