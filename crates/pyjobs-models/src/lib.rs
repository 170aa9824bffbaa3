//! Shared data models for the PyJobs job board.
//!
//! This crate provides Serde-serializable types for:
//! - Job postings, premium windows and staleness
//! - Users, profiles and resume-directory candidates
//! - Job applications and company feedback
//! - Close-link signing for job postings
//! - Page arithmetic shared by the HTML and REST listings

pub mod api_key;
pub mod application;
pub mod close_hash;
pub mod error;
pub mod job;
pub mod pagination;
pub mod profile;

// Re-export common types
pub use api_key::{digest_api_key, generate_api_key, ApiKey};
pub use application::{Applicant, ApplicationId, FeedbackType, JobApplication};
pub use close_hash::CloseHasher;
pub use error::{ModelError, ModelResult};
pub use job::{generate_job_slug, is_valid_job_slug, Job, JobId, NewJob, PremiumWindow};
pub use pagination::{Page, PageError, PageWindow, Paginator};
pub use profile::{Candidate, NewUser, Profile, ProfileUpdate, User, UserId};
