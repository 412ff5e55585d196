pub mod mind_map;
pub mod not_found;
pub mod relationships;
