//! Camera domain model.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A named video source. Created by seeding, read-only to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    pub id: i64,
    pub name: String,
    pub location: String,
}

/// Payload for registering a camera during seeding.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCamera {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 200, message = "Location must be 1-200 characters"))]
    pub location: String,
}

impl NewCamera {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}
