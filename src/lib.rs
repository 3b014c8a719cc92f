//! Credit Pre-Analysis API Library
//!
//! Turns a company's financial inputs into a pre-analysis decision (score,
//! rate, limit, affordability) and tracks third-party credit analyses
//! requested for a proposal until the bureau reaches a terminal state.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Pre-analysis rules, domain models and errors.
//! - `integrations`: Credit analysis API client and its wire models.
//! - `affordability`: Monthly capacity and installment math.
//! - `analysis_client`: `AnalysisApi` trait and its HTTP implementation.
//! - `analysis_models`: Server-side analysis records.
//! - `analysis_tracker`: Per-proposal history and poll loop.
//! - `circuit_breaker`: Circuit breaker for the analysis API.
//! - `config`: Configuration management.
//! - `decision`: Approval, interest rate and limit.
//! - `engine`: Pre-analysis pipeline.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Applicant financial inputs.
//! - `normalizer`: Tax id and currency string helpers.
//! - `scoring`: Rule-based creditworthiness score.
//! - `validation`: Input checks at the HTTP boundary.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod affordability;
pub mod analysis_client;
pub mod analysis_models;
pub mod analysis_tracker;
pub mod circuit_breaker;
pub mod config;
pub mod decision;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod scoring;
pub mod validation;
