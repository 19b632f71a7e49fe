// crates/tracker/src/input.rs
//! Client-side validation of digest submissions.
//!
//! Everything here runs before any network call; rejected input surfaces as
//! [`TrackError::Validation`] and never leaves the machine.

use crate::errors::TrackError;

/// Longest accepted protein name.
pub const MAX_NAME_LENGTH: usize = 255;
/// Longest accepted sequence, counted in residues after normalization.
pub const MAX_SEQUENCE_LENGTH: usize = 3000;

const VALID_AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY";

/// Raw submission input as the user provided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestInput {
    pub protein_name: String,
    pub sequence: String,
}

/// Input that passed validation: trimmed name, normalized sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDigest {
    pub protein_name: String,
    pub sequence: String,
}

/// Strip whitespace and line numbers (digits), uppercase the rest.
/// Pasted FASTA-style blocks with position markers normalize cleanly.
pub fn normalize_sequence(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_digit())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

fn validate_name(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return Some("Protein name is required".to_string());
    }
    if name.len() > MAX_NAME_LENGTH {
        return Some(format!("Name must be {MAX_NAME_LENGTH} characters or fewer"));
    }
    None
}

fn validate_sequence(cleaned: &str) -> Option<String> {
    if cleaned.is_empty() {
        return Some("Sequence is required".to_string());
    }
    if cleaned.len() > MAX_SEQUENCE_LENGTH {
        return Some(format!(
            "Sequence must be {MAX_SEQUENCE_LENGTH} characters or fewer (currently {})",
            cleaned.len()
        ));
    }
    let mut invalid: Vec<char> = cleaned
        .chars()
        .filter(|c| !VALID_AMINO_ACIDS.contains(*c))
        .collect();
    invalid.sort_unstable();
    invalid.dedup();
    if !invalid.is_empty() {
        let list: Vec<String> = invalid.iter().map(|c| c.to_string()).collect();
        return Some(format!(
            "Invalid amino acid(s): {}. Only the 20 standard amino acids are allowed.",
            list.join(", ")
        ));
    }
    None
}

impl DigestInput {
    /// Validate and normalize. Both fields are checked so the user sees every
    /// problem at once, joined into one message.
    pub fn validate(&self) -> Result<ValidatedDigest, TrackError> {
        let cleaned = normalize_sequence(&self.sequence);

        let problems: Vec<String> = [validate_name(&self.protein_name), validate_sequence(&cleaned)]
            .into_iter()
            .flatten()
            .collect();

        if !problems.is_empty() {
            return Err(TrackError::Validation(problems.join("; ")));
        }

        Ok(ValidatedDigest {
            protein_name: self.protein_name.trim().to_string(),
            sequence: cleaned,
        })
    }
}
