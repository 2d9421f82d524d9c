/// Question assignment generation for games.
pub mod assignment_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game configuration registration.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Same-category substitution of assigned questions.
pub mod replacement_service;
/// Session lifecycle and answer progression.
pub mod session_service;
/// Per-host lifetime statistics aggregation.
pub mod stats_service;
