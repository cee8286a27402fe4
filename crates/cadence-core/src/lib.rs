//! # Cadence Core Library
//!
//! The recurring task instance engine for the Cadence task manager:
//! given an abstract recurrence pattern, it materializes concrete dated
//! instances inside arbitrary query windows and keeps them consistent as
//! occurrences are completed, skipped, rescheduled, or deleted.
//!
//! ## Features
//!
//! - **Calendar-Correct Matching**: monthly and yearly rules count real
//!   calendar months and years, with day-of-month anchors clamped to the
//!   last day of shorter months
//! - **Exception Overlays**: skip, reschedule, and delete individual
//!   occurrences without touching the series rule; overlays always win
//!   over the pattern matcher
//! - **Idempotent Generation**: instances are upserted by their
//!   (task, due date) key, so overlapping windows never create duplicates
//! - **Bounded Work**: a hard per-call cap keeps open-ended patterns from
//!   generating without limit
//! - **Type Safety**: recurrence frequencies are a tagged union, so invalid
//!   field combinations are unrepresentable
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Instance and exception records and transfer objects
//! - [`pattern`]: Pure recurrence pattern matching and previews
//! - [`repository`]: Data access layer with Repository pattern
//! - [`error`]: Error types with context
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     db,
//!     pattern::{Frequency, RecurrencePattern},
//!     repository::{GenerationRepository, SqliteRepository},
//! };
//! use chrono::NaiveDate;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cadence_core::error::CoreError> {
//!     // Initialize database
//!     let pool = db::establish_connection("tasks.db").await?;
//!     let repo = SqliteRepository::with_defaults(pool);
//!
//!     // Materialize a daily series for January
//!     let task_id = Uuid::now_v7();
//!     let pattern = RecurrencePattern::new(
//!         Frequency::Daily { interval: 1 },
//!         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     )?;
//!
//!     let instances = repo
//!         .ensure_instances(
//!             task_id,
//!             task_id,
//!             &pattern,
//!             NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!             NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
//!         )
//!         .await?;
//!     println!("{} occurrences on the calendar", instances.len());
//!
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod pattern;
pub mod repository;
