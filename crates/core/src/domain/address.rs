use serde::{Deserialize, Serialize};

/// Address fields resolved from a CEP. `complement` may be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub district: String,
    pub city: String,
    pub state_code: String,
    pub complement: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "address", rename_all = "snake_case")]
pub enum AddressLookupResult {
    Found(Address),
    NotFound,
}
