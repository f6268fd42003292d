use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Employment arrangement requested by the caller.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Temporary,
}

impl ContractType {
    /// Parse a user-supplied value, mapping failures to the typed
    /// invalid-option error.
    pub fn parse(value: &str) -> Result<Self, Error> {
        Self::from_str(value.trim()).map_err(|_| Error::InvalidOption {
            option: "contract_type",
            value: value.to_string(),
        })
    }
}
