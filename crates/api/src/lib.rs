//! Herald API server.
//!
//! Endpoints:
//! - POST /api/auth/login — Admin credential login, returns JWT
//! - POST /api/auth/api-keys — Rotate the admin's API key
//! - POST /api/dispatch/notification — Send a notification
//! - POST /api/dispatch/survey — Send a survey
//! - POST /api/dispatch/event — Send a (possibly recurring) event
//! - POST /api/dispatch/onboarding — Send onboarding credentials
//! - GET  /api/dispatch/records — List audit records
//! - DELETE /api/dispatch/records/{id} — Delete an audit record
//! - GET  /api/employees/{id}/messages — Gateway inbox of one employee
//! - POST /api/digest/run — Force-run the daily digest
//! - GET  /health

pub mod middleware;
pub mod routes;
pub mod state;
