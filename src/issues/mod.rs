//! Diagnostics cache shared by UI collaborators

mod tracker;

pub use tracker::{IssueTracker, IssueTrackerChange};
