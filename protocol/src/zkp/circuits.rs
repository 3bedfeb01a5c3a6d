//! Public-signal evaluation for the supported statements.
//!
//! | Circuit      | Public signals                          | Output        |
//! |--------------|-----------------------------------------|---------------|
//! | age          | `[id_commit, min_age, isOverMinAge]`    | `"1"` / `"0"` |
//! | nationality  | `[id_commit, H(target), isMatch]`       | `"1"` / `"0"` |
//! | uniqueness   | `[root, unique_key_hash]`               | key hash      |
//!
//! A false statement still evaluates; its output is `"0"`.

use chrono::{Datelike, NaiveDate};

use crate::binding::ProofType;
use crate::crypto::hash::{sha256, to_prefixed_hex};
use crate::crypto::FieldElement;
use crate::error::{ProtocolError, ProtocolResult};
use crate::identity::validate_unique_key_hash;

/// Private inputs for one statement.
#[derive(Clone)]
pub enum CircuitInputs {
    Age {
        /// `YYYY-MM-DD`.
        dob: String,
        min_age: u32,
        on: NaiveDate,
        id_commit: FieldElement,
    },
    Nationality {
        nationality: String,
        target: String,
        id_commit: FieldElement,
    },
    Uniqueness {
        unique_key_hash: String,
        root: FieldElement,
    },
}

impl CircuitInputs {
    pub fn proof_type(&self) -> ProofType {
        match self {
            CircuitInputs::Age { .. } => ProofType::Age,
            CircuitInputs::Nationality { .. } => ProofType::Nationality,
            CircuitInputs::Uniqueness { .. } => ProofType::Uniqueness,
        }
    }
}

impl std::fmt::Debug for CircuitInputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CircuitInputs::{}(<redacted>)", self.proof_type())
    }
}

/// Whole years between `dob` and `on`.
pub fn age_in_years(dob: NaiveDate, on: NaiveDate) -> u32 {
    let mut age = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

fn flag(value: bool) -> String {
    let bit = if value { "1" } else { "0" };
    bit.to_string()
}

/// Compute the public signals of a statement.
pub fn evaluate(inputs: &CircuitInputs) -> ProtocolResult<Vec<String>> {
    match inputs {
        CircuitInputs::Age {
            dob,
            min_age,
            on,
            id_commit,
        } => {
            let dob = NaiveDate::parse_from_str(dob.trim(), "%Y-%m-%d").map_err(|e| {
                ProtocolError::validation(format!("date of birth must be YYYY-MM-DD: {e}"))
            })?;
            if dob > *on {
                return Err(ProtocolError::validation("date of birth is in the future"));
            }
            Ok(vec![
                id_commit.to_hex(),
                min_age.to_string(),
                flag(age_in_years(dob, *on) >= *min_age),
            ])
        }
        CircuitInputs::Nationality {
            nationality,
            target,
            id_commit,
        } => {
            let target = target.trim().to_ascii_uppercase();
            if target.is_empty() {
                return Err(ProtocolError::validation("target nationality is empty"));
            }
            Ok(vec![
                id_commit.to_hex(),
                to_prefixed_hex(&sha256(target.as_bytes())),
                flag(nationality.trim().eq_ignore_ascii_case(&target)),
            ])
        }
        CircuitInputs::Uniqueness {
            unique_key_hash,
            root,
        } => Ok(vec![root.to_hex(), validate_unique_key_hash(unique_key_hash)?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_birthday() {
        assert_eq!(age_in_years(date(2000, 6, 15), date(2018, 6, 14)), 17);
        assert_eq!(age_in_years(date(2000, 6, 15), date(2018, 6, 15)), 18);
        assert_eq!(age_in_years(date(2000, 2, 29), date(2018, 2, 28)), 17);
    }

    #[test]
    fn age_statement_outputs_flag() {
        let inputs = |dob: &str| CircuitInputs::Age {
            dob: dob.into(),
            min_age: 18,
            on: date(2026, 1, 1),
            id_commit: FieldElement::from_u64(1),
        };
        assert_eq!(evaluate(&inputs("1990-01-01")).unwrap()[2], "1");
        assert_eq!(evaluate(&inputs("2015-01-01")).unwrap()[2], "0");
        assert!(evaluate(&inputs("01/01/1990")).is_err());
        assert!(evaluate(&inputs("2030-01-01")).is_err());
    }

    #[test]
    fn nationality_is_case_insensitive() {
        let signals = evaluate(&CircuitInputs::Nationality {
            nationality: "mys".into(),
            target: "MYS".into(),
            id_commit: FieldElement::from_u64(1),
        })
        .unwrap();
        assert_eq!(signals[2], "1");
    }

    #[test]
    fn uniqueness_outputs_key_hash() {
        let signals = evaluate(&CircuitInputs::Uniqueness {
            unique_key_hash: "0xABCD".into(),
            root: FieldElement::from_u64(9),
        })
        .unwrap();
        assert_eq!(signals.last().unwrap(), "0xabcd");
    }

    #[test]
    fn debug_hides_inputs() {
        let inputs = CircuitInputs::Nationality {
            nationality: "MYS".into(),
            target: "MYS".into(),
            id_commit: FieldElement::from_u64(1),
        };
        assert!(!format!("{inputs:?}").contains("MYS"));
    }
}
