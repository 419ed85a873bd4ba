#[path = "property/calibration_bounds.rs"]
mod calibration_bounds;

#[path = "property/energy_and_acceptance.rs"]
mod energy_and_acceptance;

#[path = "property/vector_geometry.rs"]
mod vector_geometry;
