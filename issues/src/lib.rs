//! # Vigil Issues
//!
//! Listing/filtering, the status state machine, assignment, comments, the
//! append-only activity log, bulk update, and statistics rollups over
//! issues (C7). Authorization is the caller's job (`vigil_tenancy`); this
//! crate only enforces invariants intrinsic to an issue.

#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod repository;
pub mod service;

pub use error::IssueError;
pub use model::{
    ActivityType, AssigneeFilter, BulkAction, BulkUpdateResult, EventSummary, Issue, IssueActivity,
    IssueComment, IssueDetail, IssueFilter, IssueListPage, IssueStats, IssueStatus, IssueType,
    SortField, SortOrder,
};
pub use repository::IssueRepository;
