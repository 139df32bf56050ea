//! WhatsApp Cloud API client and webhook payload types.

mod client;
pub mod types;

pub use client::{SentMessage, WhatsAppClient, WhatsAppError};
