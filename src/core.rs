//! Core domain types and service traits for SodaCert
//!
//! This module defines the fundamental data structures and trait contracts
//! that govern component interactions throughout the application.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single certificate-transparency event, reduced to the fields the
/// pipeline acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertEvent {
    /// The upstream message type (e.g. "certificate_update", "heartbeat").
    pub message_type: String,
    /// Subject common name of the leaf certificate. Empty when missing.
    pub common_name: String,
}

impl CertEvent {
    /// Creates a certificate update event for the given common name.
    pub fn certificate_update(common_name: impl Into<String>) -> Self {
        Self {
            message_type: "certificate_update".to_string(),
            common_name: common_name.into(),
        }
    }

    /// Returns true for keepalive messages that carry no certificate.
    pub fn is_heartbeat(&self) -> bool {
        self.message_type == "heartbeat"
    }
}

/// A common name that matched the keyword filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// A common name stored exactly as it appeared on the certificate.
    Plain(String),
    /// An IDNA-encoded common name, stored in its decoded Unicode form.
    Punycode(String),
}

impl Domain {
    /// The stored string value of this domain.
    pub fn as_str(&self) -> &str {
        match self {
            Domain::Plain(name) | Domain::Punycode(name) => name,
        }
    }

    pub fn is_punycode(&self) -> bool {
        matches!(self, Domain::Punycode(_))
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Service Traits
// =============================================================================

/// The operator's terminal.
///
/// The dispatcher and the live viewer only need to print text, clear the
/// screen and read one line of input, so everything else about the console
/// stays behind this trait.
#[async_trait]
pub trait Terminal: Send + Sync {
    /// Writes `text` to the terminal as-is and flushes it.
    fn print(&self, text: &str);

    /// Clears the screen and moves the cursor to the top-left corner.
    fn clear(&self);

    /// Reads one line of operator input, without the trailing newline.
    ///
    /// # Returns
    /// * `Ok(Some(line))` when a line was read
    /// * `Ok(None)` when the input stream has ended
    /// * `Err` if reading failed
    async fn read_line(&self) -> Result<Option<String>>;
}
