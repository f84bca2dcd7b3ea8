//! Command-line SMS client for HTTP gateway providers.
//!
//! The core pipeline turns a possibly-symbolic recipient, a message, and a
//! configuration profile into exactly one well-formed provider request and
//! classifies the reply: a domain layer of validated types, a contacts
//! layer resolving names to numbers, a config layer merging profiles with
//! shared settings, a transport layer for the wire format, and a small
//! client orchestrating one invocation over an injectable HTTP transport.
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use smsl::{ConfigStore, MessageText, SmslClient, StdinPrompt, resolve_profile};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = ConfigStore::load_default()?;
//!     let profile = resolve_profile(&store, None, &BTreeMap::new(), &StdinPrompt)?;
//!     let book = store.contacts()?;
//!     let csv = store.csv_contacts()?;
//!
//!     let client = SmslClient::new();
//!     let message = MessageText::new("Hey Dude!")?;
//!     let _outcome = client
//!         .send(&profile, &book, csv.as_ref(), "dude", &message, false)
//!         .await?;
//!     Ok(())
//! }
//! ```
#![forbid(unsafe_code)]

pub mod cli;
pub mod client;
pub mod config;
pub mod contacts;
pub mod domain;
pub mod transport;

pub use client::{HistoryRecord, Outcome, SmsError, SmslClient};
pub use config::{
    ConfigError, ConfigStore, ResolvedProfile, SecretPrompt, StdinPrompt, resolve_profile,
};
pub use contacts::{ContactBook, ContactError, CsvContacts, all_contacts, resolve_receiver};
pub use domain::{CountryCode, MessageText, PhoneNumber, ValidationError, segment_count};
pub use transport::{RequestError, ResponseError, UrlTemplate, Verdict, interpret};
