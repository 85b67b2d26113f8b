//! deadline-alerts - Personalized deadline reminders for posted opportunities.
//!
//! Every hour the engine picks the subscribers whose alert hour has come, finds
//! the opportunities due within each subscriber's window and of the types they
//! follow, renders a reminder and sends it over the subscriber's channel:
//! - Deadline window matching and message rendering (`alert`)
//! - Email delivery with a chat channel stub (`channel`)
//! - Scheduled and manual alert runs (`service`, `task`)

pub mod alert;
pub mod channel;
pub mod config;
pub mod entity;
pub mod error;
pub mod logging;
pub mod repository;
pub mod service;
pub mod task;
