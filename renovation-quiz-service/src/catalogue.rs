//! The fixed catalogue of quiz steps.

use serde::{Deserialize, Serialize};

/// Number of steps shown in the "Step N of 9" progress label.
pub const TOTAL_STEPS: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStep {
    Landing,
    RenoType,
    BedBathCount,
    SqftToAdd,
    StructChanges,
    SqftToReno,
    MaterialGrade,
    PropertySize,
    Location,
    Result,
}

impl QuizStep {
    pub const ALL: [QuizStep; 10] = [
        QuizStep::Landing,
        QuizStep::RenoType,
        QuizStep::BedBathCount,
        QuizStep::SqftToAdd,
        QuizStep::StructChanges,
        QuizStep::SqftToReno,
        QuizStep::MaterialGrade,
        QuizStep::PropertySize,
        QuizStep::Location,
        QuizStep::Result,
    ];

    pub fn id(self) -> &'static str {
        match self {
            QuizStep::Landing => "landing",
            QuizStep::RenoType => "reno_type",
            QuizStep::BedBathCount => "bed_bath_count",
            QuizStep::SqftToAdd => "sqft_to_add",
            QuizStep::StructChanges => "struct_changes",
            QuizStep::SqftToReno => "sqft_to_reno",
            QuizStep::MaterialGrade => "material_grade",
            QuizStep::PropertySize => "property_size",
            QuizStep::Location => "location",
            QuizStep::Result => "result",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.id() == id)
    }

    /// Fixed position of the step; numbering does not shift when a step is skipped.
    pub fn position(self) -> u8 {
        match self {
            QuizStep::Landing => 0,
            QuizStep::RenoType => 1,
            QuizStep::BedBathCount => 2,
            QuizStep::SqftToAdd => 3,
            QuizStep::StructChanges => 4,
            QuizStep::SqftToReno => 5,
            QuizStep::MaterialGrade => 6,
            QuizStep::PropertySize => 7,
            QuizStep::Location => 8,
            QuizStep::Result => 9,
        }
    }

    pub fn progress_label(self) -> Option<String> {
        match self {
            QuizStep::Landing => None,
            step => Some(format!("Step {} of {}", step.position(), TOTAL_STEPS)),
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            QuizStep::Landing => "Property Renovation Calculator",
            QuizStep::RenoType => "What would you like to renovate?",
            QuizStep::BedBathCount => "How many rooms?",
            QuizStep::SqftToAdd => "Are you doing an extension?",
            QuizStep::StructChanges => "Any structural changes required?",
            QuizStep::SqftToReno => "Sqft to Renovate",
            QuizStep::MaterialGrade => "Select Material Grade",
            QuizStep::PropertySize => "What is the property size?",
            QuizStep::Location => "Where is your property?",
            QuizStep::Result => "Your Estimated Renovation Cost",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_and_positions_are_sequential() {
        for (index, step) in QuizStep::ALL.into_iter().enumerate() {
            assert_eq!(QuizStep::from_id(step.id()), Some(step));
            assert_eq!(usize::from(step.position()), index);
        }
        assert_eq!(QuizStep::from_id("nope"), None);
    }

    #[test]
    fn progress_label_uses_fixed_numbering() {
        assert_eq!(QuizStep::Landing.progress_label(), None);
        assert_eq!(QuizStep::SqftToAdd.progress_label().as_deref(), Some("Step 3 of 9"));
        assert_eq!(QuizStep::Result.progress_label().as_deref(), Some("Step 9 of 9"));
    }
}
