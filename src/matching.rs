//! Keyword classifier for certificate common names
//!
//! The keyword list is plain data; it is compiled once into a single
//! case-sensitive alternation and never touched again by the hot path.

use crate::core::Domain;
use anyhow::Result;
use regex::Regex;
use thiserror::Error;

/// The ASCII-compatible encoding prefix of an IDNA label.
pub const ACE_PREFIX: &str = "xn--";

/// The keywords a common name is matched against when none are configured.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "hacking",
    "hitman",
    "carding",
    "fullz",
    "dumps",
    "banklogs",
    "counterfeit",
    "passport",
    "cocaine",
    "meth",
    "heroin",
    "drainer",
];

/// Errors raised while classifying a matched common name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("failed to decode punycode label '{label}' in common name '{common_name}'")]
    Punycode { common_name: String, label: String },
}

/// Decides whether a common name is interesting and which kind of domain it is.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    /// `None` when no keywords are configured; nothing matches then.
    regex: Option<Regex>,
    keywords: Vec<String>,
}

impl KeywordClassifier {
    /// Compiles the keyword list into a matcher.
    ///
    /// Keywords are matched literally as substrings. Empty entries are skipped.
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k| !k.is_empty())
            .collect();

        let regex = if keywords.is_empty() {
            None
        } else {
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!("({alternation})"))?)
        };

        Ok(Self { regex, keywords })
    }

    /// Builds a classifier from [`DEFAULT_KEYWORDS`].
    pub fn with_default_keywords() -> Result<Self> {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }

    /// The keywords this classifier was built from, in configuration order.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns true if the common name contains any keyword.
    pub fn is_match(&self, common_name: &str) -> bool {
        self.regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(common_name))
    }

    /// Classifies a raw common name.
    ///
    /// The keyword test runs on the string as received, so a keyword inside
    /// an encoded label still matches before decoding.
    ///
    /// # Returns
    /// * `Ok(None)` if no keyword matches
    /// * `Ok(Some(Domain::Punycode(_)))` with the decoded form if the name carries an `xn--` marker
    /// * `Ok(Some(Domain::Plain(_)))` with the name unchanged otherwise
    /// * `Err` if a marked label is not valid punycode
    pub fn classify(&self, common_name: &str) -> Result<Option<Domain>, ClassifyError> {
        if !self.is_match(common_name) {
            return Ok(None);
        }

        if common_name.contains(ACE_PREFIX) {
            return decode_punycode(common_name).map(|decoded| Some(Domain::Punycode(decoded)));
        }

        Ok(Some(Domain::Plain(common_name.to_string())))
    }
}

/// Decodes every `xn--` label of a name to Unicode.
///
/// This is a raw decode: labels are converted with plain RFC 3492 punycode
/// and no UTS #46 mapping or validation is applied. Labels without the
/// prefix are kept verbatim.
pub fn decode_punycode(name: &str) -> Result<String, ClassifyError> {
    let labels = name
        .split('.')
        .map(|label| match label.strip_prefix(ACE_PREFIX) {
            Some(encoded) if !encoded.is_empty() => idna::punycode::decode_to_string(encoded)
                .ok_or_else(|| ClassifyError::Punycode {
                    common_name: name.to_string(),
                    label: label.to_string(),
                }),
            Some(_) => Err(ClassifyError::Punycode {
                common_name: name.to_string(),
                label: label.to_string(),
            }),
            None => Ok(label.to_string()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(labels.join("."))
}
