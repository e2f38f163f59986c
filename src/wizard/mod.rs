//! Multi-step post creation wizard.
//!
//! Items go basic-info → specifications → trade-preferences → location →
//! review; services replace specifications with pricing.

pub mod progress;
pub mod reducer;
pub mod review;
pub mod session;

pub use progress::Progress;
pub use reducer::{reduce, DraftEvent, DraftLimits, ReduceError};
pub use session::{StepOutcome, WizardError, WizardSession};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::draft::PostType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    BasicInfo,
    Specifications,
    Pricing,
    TradePreferences,
    Location,
    Review,
}

const ITEM_STEPS: &[Step] = &[
    Step::BasicInfo,
    Step::Specifications,
    Step::TradePreferences,
    Step::Location,
    Step::Review,
];

const SERVICE_STEPS: &[Step] = &[
    Step::BasicInfo,
    Step::Pricing,
    Step::TradePreferences,
    Step::Location,
    Step::Review,
];

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::BasicInfo => "basic-info",
            Step::Specifications => "specifications",
            Step::Pricing => "pricing",
            Step::TradePreferences => "trade-preferences",
            Step::Location => "location",
            Step::Review => "review",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Step::BasicInfo => "Basic Info",
            Step::Specifications => "Specifications",
            Step::Pricing => "Pricing",
            Step::TradePreferences => "Trade Preferences",
            Step::Location => "Location",
            Step::Review => "Review & Submit",
        }
    }

    /// Ordered steps of the wizard for `post_type`
    pub fn sequence(post_type: PostType) -> &'static [Step] {
        match post_type {
            PostType::Item => ITEM_STEPS,
            PostType::Service => SERVICE_STEPS,
        }
    }

    pub fn first(post_type: PostType) -> Step {
        Step::BasicInfo.clamp_to(post_type)
    }

    /// Zero-based position in the sequence, if the step belongs to it
    pub fn index_in(&self, post_type: PostType) -> Option<usize> {
        Step::sequence(post_type).iter().position(|s| s == self)
    }

    pub fn next_in(&self, post_type: PostType) -> Option<Step> {
        let idx = self.index_in(post_type)?;
        Step::sequence(post_type).get(idx + 1).copied()
    }

    pub fn previous_in(&self, post_type: PostType) -> Option<Step> {
        let idx = self.index_in(post_type)?;
        idx.checked_sub(1)
            .and_then(|i| Step::sequence(post_type).get(i).copied())
    }

    /// Map a step from the other post type's flow onto this one
    /// (pricing ⇄ specifications); other steps are shared.
    pub fn clamp_to(self, post_type: PostType) -> Step {
        match (self, post_type) {
            (Step::Pricing, PostType::Item) => Step::Specifications,
            (Step::Specifications, PostType::Service) => Step::Pricing,
            (step, _) => step,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic-info" => Ok(Step::BasicInfo),
            "specifications" => Ok(Step::Specifications),
            "pricing" => Ok(Step::Pricing),
            "trade-preferences" => Ok(Step::TradePreferences),
            "location" => Ok(Step::Location),
            "review" => Ok(Step::Review),
            other => Err(format!("unknown step '{}'", other)),
        }
    }
}
