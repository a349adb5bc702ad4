//! partwise - an ordered-parts catalog service
//!
//! Episodes own ordered lists of parts. The crate keeps each list's
//! `position` column a unique, contiguous sequence under concurrent writes:
//! row locks and transactions in [`store`], the repositioning state machine
//! and deferred correction queue in [`reorder`], orchestration in
//! [`service`], and the HTTP surface in [`api`].

pub mod api;
pub mod cli;
pub mod config;
pub mod reorder;
pub mod service;
pub mod store;
