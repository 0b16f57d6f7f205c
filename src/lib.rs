#![forbid(unsafe_code)]

//! Shared library for the TutorTube binaries.
//!
//! The interesting logic lives in [`videos`] (normalizing raw provider
//! records) and [`discovery`] (query augmentation, tutorial/short
//! classification and the per-request pipeline). [`youtube`] talks to the
//! external search provider; [`config`] and [`security`] are runtime plumbing.

pub mod config;
pub mod discovery;
pub mod security;
pub mod videos;
pub mod youtube;
