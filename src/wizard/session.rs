//! Step-form controller: pre-fills from the stored draft, saves partial
//! data on demand, validates before moving forward.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::{reduce, DraftEvent, DraftLimits, Progress, ReduceError, Step};
use crate::draft::{Draft, DraftPatch, DraftStore, PostType};
use crate::schema::{PostSchema, ValidationErrors};

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Reduce(#[from] ReduceError),

    #[error("'{0}' is the final step; submit the post instead")]
    AtFinalStep(Step),
}

/// Where the wizard landed after a transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    pub progress: Progress,
}

pub struct WizardSession {
    post_type: PostType,
    store: DraftStore,
    schema: PostSchema,
    limits: DraftLimits,
    step: Step,
    working: Draft,
}

impl WizardSession {
    /// Open the wizard at its first step
    pub fn open(store: DraftStore, post_type: PostType, limits: DraftLimits) -> Self {
        Self::open_at(store, post_type, limits, Step::first(post_type))
    }

    /// Open the wizard at `step`, pre-filled with the stored draft
    pub fn open_at(store: DraftStore, post_type: PostType, limits: DraftLimits, step: Step) -> Self {
        let working = store.get_draft(post_type).unwrap_or_default();
        Self {
            post_type,
            schema: PostSchema::for_type(post_type, limits.max_images),
            store,
            limits,
            step: step.clamp_to(post_type),
            working,
        }
    }

    pub fn post_type(&self) -> PostType {
        self.post_type
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Working copy including unsaved edits
    pub fn draft(&self) -> &Draft {
        &self.working
    }

    pub fn progress(&self) -> Progress {
        Progress::of(self.post_type, self.step)
    }

    /// Apply a form interaction to the working copy
    pub fn apply(&mut self, event: &DraftEvent) -> Result<&Draft, WizardError> {
        self.working = reduce(&self.working, event, &self.limits)?;
        Ok(&self.working)
    }

    /// Merge raw field values into the working copy. Category-like fields are
    /// routed through the reducer so cascades still happen.
    pub fn edit(&mut self, patch: &DraftPatch) -> Result<&Draft, WizardError> {
        // Parents before children, or a later category change would wipe them
        let mut fields: Vec<_> = patch.0.iter().collect();
        fields.sort_by_key(|(field, _)| cascade_rank(field));

        for (field, value) in fields {
            let event = DraftEvent::SetField {
                field: field.clone(),
                value: value.clone(),
            };
            self.working = reduce(&self.working, &event, &self.limits)?;
        }
        Ok(&self.working)
    }

    /// Persist the working copy as-is, valid or not
    pub fn save_draft(&mut self) -> Option<Draft> {
        let patch = match DraftPatch::from_draft(&self.working) {
            Ok(patch) => patch,
            Err(e) => {
                tracing::warn!(error = %e, "Draft could not be serialized");
                return None;
            }
        };
        let saved = self.store.save_draft(self.post_type, &patch)?;
        self.working = saved.clone();
        Some(saved)
    }

    /// Validate the current step without moving
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.schema.validate_step(self.step, &self.working)
    }

    /// Validate the current step; if valid, persist and advance
    pub fn next(&mut self) -> Result<StepOutcome, WizardError> {
        let next = self
            .step
            .next_in(self.post_type)
            .ok_or(WizardError::AtFinalStep(self.step))?;

        if let Err(errors) = self.validate() {
            debug!(
                post_type = %self.post_type,
                step = %self.step,
                fields = ?errors.fields(),
                "Step validation failed"
            );
            return Err(errors.into());
        }

        self.save_draft();
        self.step = next;
        info!(post_type = %self.post_type, step = %self.step, "Advanced wizard");

        Ok(StepOutcome {
            step: self.step,
            progress: self.progress(),
        })
    }

    /// Go back one step without validating or saving. Unsaved edits are
    /// discarded by reloading the stored draft.
    pub fn previous(&mut self) -> StepOutcome {
        if let Some(prev) = self.step.previous_in(self.post_type) {
            self.step = prev;
        }
        self.working = self.store.get_draft(self.post_type).unwrap_or_default();

        StepOutcome {
            step: self.step,
            progress: self.progress(),
        }
    }

    /// Review-step summary of the working copy
    pub fn review(&self) -> anyhow::Result<String> {
        super::review::render_review(self.post_type, &self.working)
    }
}

fn cascade_rank(field: &str) -> u8 {
    match field {
        "category" => 0,
        "subcategory" => 1,
        "brand" => 2,
        _ => 3,
    }
}
