pub mod community_responses;
pub mod patient_responses;
