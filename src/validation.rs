//! Name validation for dragons, players and console identities.

use std::collections::HashSet;

/// Name validation errors with messages suitable for showing to the player.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("Name is empty")]
    Empty,

    #[error("Name is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Name is reserved")]
    Reserved,
}

/// Length and character rules applied to a name.
#[derive(Debug, Clone)]
pub struct NameRules {
    pub max_length: usize,
    pub allow_spaces: bool,
    pub allow_unicode: bool,
    pub allow_reserved: bool,
}

impl NameRules {
    /// Dragon names: any printable text up to 24 characters.
    pub fn dragon() -> Self {
        NameRules {
            max_length: 24,
            allow_spaces: true,
            allow_unicode: true,
            allow_reserved: true,
        }
    }

    /// Player identifiers used as storage keys: no spaces, ASCII only.
    pub fn player_id() -> Self {
        NameRules {
            max_length: 32,
            allow_spaces: false,
            allow_unicode: false,
            allow_reserved: false,
        }
    }

    pub fn display_name() -> Self {
        NameRules {
            max_length: 32,
            allow_spaces: true,
            allow_unicode: true,
            allow_reserved: true,
        }
    }
}

fn reserved_names() -> HashSet<&'static str> {
    ["world", "system", "admin", "boss", "dragon", "nobody"]
        .iter()
        .copied()
        .collect()
}

/// Validate `name` against `rules`, returning the trimmed name.
pub fn validate_name(name: &str, rules: &NameRules) -> Result<String, NameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    if trimmed.chars().count() > rules.max_length {
        return Err(NameError::TooLong {
            max: rules.max_length,
        });
    }
    if !rules.allow_reserved && reserved_names().contains(trimmed.to_lowercase().as_str()) {
        return Err(NameError::Reserved);
    }

    let mut invalid: Vec<char> = trimmed
        .chars()
        .filter(|&ch| {
            let ok = if ch.is_control() {
                false
            } else if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.' {
                true
            } else if ch.is_whitespace() {
                rules.allow_spaces && ch == ' '
            } else if !ch.is_ascii() {
                rules.allow_unicode
            } else {
                // Remaining ASCII punctuation.
                rules.allow_spaces
            };
            !ok
        })
        .collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        invalid.dedup();
        let chars = invalid
            .into_iter()
            .map(|c| {
                if c.is_control() {
                    format!("\\u{{{:04x}}}", c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        return Err(NameError::InvalidCharacters { chars });
    }

    Ok(trimmed.to_string())
}

pub fn validate_dragon_name(name: &str) -> Result<String, NameError> {
    validate_name(name, &NameRules::dragon())
}

pub fn validate_player_id(id: &str) -> Result<String, NameError> {
    validate_name(id, &NameRules::player_id())
}

pub fn validate_display_name(name: &str) -> Result<String, NameError> {
    validate_name(name, &NameRules::display_name())
}
