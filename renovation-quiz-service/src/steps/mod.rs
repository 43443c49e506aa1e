// Renovation quiz steps, in the order they are shown
pub mod landing;
pub mod reno_type;
pub mod bed_bath_count;
pub mod sqft;
pub mod struct_changes;
pub mod material_grade;
pub mod property_size;
pub mod location;
pub mod result;

// Shared modules
pub mod types;
pub mod utils;

// Re-export step implementations
pub use landing::LandingStep;
pub use reno_type::RenoTypeStep;
pub use bed_bath_count::BedBathCountStep;
pub use sqft::SqftStep;
pub use struct_changes::StructChangesStep;
pub use material_grade::MaterialGradeStep;
pub use property_size::PropertySizeStep;
pub use location::LocationStep;
pub use result::ResultStep;

// Re-export session keys
pub use types::session_keys;
