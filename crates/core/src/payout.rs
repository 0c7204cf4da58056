//! PIX payout key (where commissions are paid to).
//!
//! Keys are stored in canonical form so the stored string alone identifies its kind:
//! CPF is 11 digits, CNPJ 14 digits, phone is `+55` followed by 10-11 digits,
//! e-mail contains `@` and random keys are UUIDs.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Kind of PIX key as offered in the payout form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixKeyKind {
    #[serde(rename = "cpf")]
    Cpf,
    #[serde(rename = "cnpj")]
    Cnpj,
    #[serde(rename = "telefone")]
    Phone,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "aleatoria")]
    Random,
}

impl PixKeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixKeyKind::Cpf => "cpf",
            PixKeyKind::Cnpj => "cnpj",
            PixKeyKind::Phone => "telefone",
            PixKeyKind::Email => "email",
            PixKeyKind::Random => "aleatoria",
        }
    }
}

impl FromStr for PixKeyKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpf" => Ok(PixKeyKind::Cpf),
            "cnpj" => Ok(PixKeyKind::Cnpj),
            "telefone" | "phone" => Ok(PixKeyKind::Phone),
            "email" | "e-mail" => Ok(PixKeyKind::Email),
            "aleatoria" | "random" => Ok(PixKeyKind::Random),
            other => Err(DomainError::validation(format!("unknown pix key kind '{other}'"))),
        }
    }
}

/// Validated PIX key in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PixKey {
    kind: PixKeyKind,
    value: String,
}

impl ValueObject for PixKey {}

impl PixKey {
    /// Validate `raw` as a key of the declared `kind`, normalising punctuation.
    pub fn new(kind: PixKeyKind, raw: &str) -> DomainResult<Self> {
        let raw = raw.trim();
        let value = match kind {
            PixKeyKind::Cpf => digits_of_len(raw, 11, "cpf")?,
            PixKeyKind::Cnpj => digits_of_len(raw, 14, "cnpj")?,
            PixKeyKind::Phone => {
                let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
                let has_garbage = raw
                    .chars()
                    .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')')));
                let national = if raw.starts_with('+') {
                    digits.strip_prefix("55").map(str::to_string)
                } else {
                    Some(digits)
                };
                match national {
                    Some(n) if !has_garbage && (10..=11).contains(&n.len()) => format!("+55{n}"),
                    _ => return Err(DomainError::validation("telefone must be a brazilian number")),
                }
            }
            PixKeyKind::Email => {
                let lower = raw.to_lowercase();
                let valid = match lower.split_once('@') {
                    Some((local, domain)) => {
                        !local.is_empty() && domain.contains('.') && !lower.contains(char::is_whitespace)
                    }
                    None => false,
                };
                if !valid {
                    return Err(DomainError::validation("email pix key is malformed"));
                }
                lower
            }
            PixKeyKind::Random => Uuid::from_str(raw)
                .map_err(|_| DomainError::validation("aleatoria pix key must be a uuid"))?
                .hyphenated()
                .to_string(),
        };

        Ok(Self { kind, value })
    }

    /// Parse a key stored in canonical form, inferring its kind.
    pub fn parse(stored: &str) -> DomainResult<Self> {
        let stored = stored.trim();
        let kind = if stored.starts_with('+') {
            PixKeyKind::Phone
        } else if stored.contains('@') {
            PixKeyKind::Email
        } else if Uuid::from_str(stored).is_ok() {
            PixKeyKind::Random
        } else {
            match stored.len() {
                11 => PixKeyKind::Cpf,
                14 => PixKeyKind::Cnpj,
                _ => return Err(DomainError::validation("unrecognised pix key")),
            }
        };
        Self::new(kind, stored)
    }

    pub fn kind(&self) -> PixKeyKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

fn digits_of_len(raw: &str, len: usize, label: &str) -> DomainResult<String> {
    let stripped: String = raw.chars().filter(|c| !matches!(c, '.' | '-' | '/' | ' ')).collect();
    if stripped.len() == len && stripped.chars().all(|c| c.is_ascii_digit()) {
        Ok(stripped)
    } else {
        Err(DomainError::validation(format!("{label} must have {len} digits")))
    }
}

impl core::fmt::Display for PixKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.value)
    }
}

impl TryFrom<String> for PixKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PixKey> for String {
    fn from(value: PixKey) -> Self {
        value.value
    }
}
