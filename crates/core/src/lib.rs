//! Core business logic for OpenDraft.
//!
//! Services own the rules: post lifecycle, comment moderation, the follow
//! graph and its notifications, and the report queue. Every role and
//! ownership check goes through [`policy`].

pub mod pagination;
pub mod policy;
pub mod scheduler;
pub mod services;

pub use pagination::{Page, PageRequest};
pub use policy::{Actor, Permission, authorize};
pub use scheduler::{JobExecutor, SchedulerConfig, run_scheduler};
pub use services::*;
