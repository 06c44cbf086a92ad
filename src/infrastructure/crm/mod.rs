//! CRM backend REST adapter.

mod client;
mod dto;

pub use client::CrmClient;
