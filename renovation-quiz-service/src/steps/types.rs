use serde::{Deserialize, Serialize};

pub const FULL_RENOVATION: &str = "Full renovation";
pub const BEDROOM: &str = "Bedroom";
pub const BATHROOM: &str = "Bathroom";

/// Renovation types in the order they are offered.
pub const RENOVATION_TYPES: [&str; 6] = [
    FULL_RENOVATION,
    BEDROOM,
    "Kitchen",
    BATHROOM,
    "Living room",
    "Other/Custom",
];

/// Selecting any of these routes through the room-count step.
pub const ROOM_COUNT_TYPES: [&str; 3] = [BEDROOM, BATHROOM, FULL_RENOVATION];

pub const MATERIAL_GRADES: [&str; 3] = ["High-end", "Mid-range", "Budget-friendly"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuralChange {
    Yes,
    No,
}

// keys written to the answer store; these are also the wire names sent to the estimator
pub mod session_keys {
    pub const RENOVATION_TYPE: &str = "renovation_type";
    pub const BEDROOMS_TO_RENO: &str = "bedrooms_to_reno";
    pub const BATHROOMS_TO_RENO: &str = "bathrooms_to_reno";
    pub const SQFT_TO_ADD: &str = "sqft_to_add";
    pub const STRUCTURAL_CHANGES: &str = "structural_changes";
    pub const SQFT_RENOVATED: &str = "sqft_renovated";
    pub const MATERIAL_GRADE: &str = "material_grade";
    pub const PROPERTY_SIZE: &str = "property_size";
    pub const LOCATION: &str = "Location";
    pub const PREDICTED_COST: &str = "predicted_cost";
    pub const POST_RENOVATION_VALUE: &str = "post_renovation_value";
    pub const ESTIMATE_UNAVAILABLE: &str = "estimate_unavailable";
}

pub mod messages {
    pub const SELECT_AT_LEAST_ONE: &str = "Please select at least one option";
    pub const ENTER_A_VALUE: &str = "Please enter a value";
    pub const GREATER_THAN_ZERO: &str = "Please enter a number greater than 0";
    pub const FILL_ALL_FIELDS: &str = "Please fill in all fields before continuing";
    pub const ANSWER_ALL_ROOMS: &str = "Please answer all rooms before continuing";
    pub const SELECT_MATERIAL_GRADE: &str = "Please select a material grade for all rooms";
    pub const SELECT_LOCATION: &str = "Please select a location";
}
