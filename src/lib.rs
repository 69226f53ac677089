//! Client-side transaction cache for a personal finance tracker.
//!
//! The backend owns every record. This crate talks to it over its JSON API
//! ([`client`]), keeps an in-memory replica of the user's transactions in
//! step with confirmed server changes ([`cache`]), supports undoing
//! deletes, and hands ready-to-draw table rows and chart data to whatever
//! renders them ([`view`]).
//!
//! ```rust,no_run
//! use ledger_sync::cache::Ledger;
//! use ledger_sync::config::Config;
//! use ledger_sync::models::FilterCriteria;
//! use ledger_sync::view::NoopView;
//!
//! # async fn run() -> ledger_sync::error::Result<()> {
//! let config = Config::from_env()?;
//! let ledger = Ledger::new(config.client()?, NoopView);
//! ledger.load_entities().await?;
//! ledger.load(FilterCriteria::new()).await?;
//! for row in ledger.table()? {
//!     println!("{} {} {}", row.date, row.info, row.base_amount);
//! }
//! # Ok(())
//! # }
//! ```

extern crate alloc;

pub mod api;
pub mod cache;
#[cfg(feature = "async")]
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod view;
