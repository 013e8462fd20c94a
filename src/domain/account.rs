use serde::{Deserialize, Serialize};

/// Tagged variant over supported venues. A second venue is added by adding
/// a variant here and matching on it in the Instance Pool's construction
/// path; callers never branch on venue kind themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    StarknetPerp,
}

/// A configured account record. Persisted by the Config Store, referenced
/// by the Instance Pool, destroyed explicitly (which evicts the pool entry).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub account_key: String,
    pub name: VenueKind,
    pub account_alias: String,
    pub api_key: String,
    pub secret_key: String,
    pub testnet: bool,

    /// Starknet perpetual venue fields. Required (Configuration error if
    /// absent) when `name == VenueKind::StarknetPerp`.
    pub vault: Option<u64>,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub default_market: Option<String>,
}

impl Account {
    /// Validates the venue-specific required fields up front, matching
    /// `ExchangeInstancePool`'s pre-construction checks rather than
    /// deferring the failure to first use.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        if self.api_key.is_empty() {
            return Err(crate::error::Error::Configuration {
                field: "api_key".to_string(),
                message: "api_key is required".to_string(),
            });
        }
        match self.name {
            VenueKind::StarknetPerp => {
                if self.vault.is_none() {
                    return Err(crate::error::Error::Configuration {
                        field: "vault".to_string(),
                        message: "vault is required for the starknet perp venue".to_string(),
                    });
                }
                if self.public_key.is_none() {
                    return Err(crate::error::Error::Configuration {
                        field: "public_key".to_string(),
                        message: "public_key is required for the starknet perp venue"
                            .to_string(),
                    });
                }
                if self.private_key.is_none() {
                    return Err(crate::error::Error::Configuration {
                        field: "private_key".to_string(),
                        message: "private_key (or secret_key) is required for the starknet perp venue"
                            .to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
