//! Background tasks.

pub mod alert_scheduler;
