//! Progress indicator state for the wizard header.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Step;
use crate::draft::PostType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Progress {
    /// 1-based position of the current step
    pub current: usize,
    pub total: usize,
    pub percent: u8,
    pub label: String,
}

impl Progress {
    pub fn of(post_type: PostType, step: Step) -> Self {
        let step = step.clamp_to(post_type);
        let total = Step::sequence(post_type).len();
        let current = step.index_in(post_type).map_or(1, |i| i + 1);
        let percent = ((current * 100) / total.max(1)) as u8;

        Self {
            current,
            total,
            percent,
            label: format!("Step {} of {}: {}", current, total, step.label()),
        }
    }

    pub fn is_last(&self) -> bool {
        self.current == self.total
    }
}
