//! Entity type definitions
//!
//! BMS tracks four independent record types:
//! - [`Handover`] - shift transitions between people or teams
//! - [`Requirement`] - requirements and change requests
//! - [`Issue`] - reported problems with type, severity and assignee
//! - [`TestSuite`] - latest pass/fail result of an automated suite

pub mod handover;
pub mod issue;
pub mod requirement;
pub mod test_suite;

pub use handover::{Handover, HandoverPatch, HandoverStatus};
pub use issue::{Issue, IssuePatch, IssueSeverity, IssueStatus, IssueType};
pub use requirement::{Requirement, RequirementPatch, RequirementPriority, RequirementStatus};
pub use test_suite::{TestSuite, TestSuitePatch, TestSuiteStatus};

use crate::core::entity::choice_enum;

choice_enum! {
    /// Which of the four record types a value refers to
    pub enum EntityKind("record kind") {
        Handover => "handover",
        Requirement => "requirement",
        Issue => "issue",
        TestSuite => "test_suite",
    }
}

impl EntityKind {
    /// Title-case label for reports ("Test Suite")
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Handover => "Handover",
            EntityKind::Requirement => "Requirement",
            EntityKind::Issue => "Issue",
            EntityKind::TestSuite => "Test Suite",
        }
    }

    /// Plural used in export filenames and CLI arguments
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Handover => "handovers",
            EntityKind::Requirement => "requirements",
            EntityKind::Issue => "issues",
            EntityKind::TestSuite => "test_suites",
        }
    }
}
