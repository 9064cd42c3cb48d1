// Guest records: who a reservation is for, keyed by phone number for lookups

use serde::{Deserialize, Serialize};
use std::fmt;

// Guest details attached to a reservation. The phone number is the lookup key
// for a guest's reservation history; it is not required to be unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl Guest {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            email: email.into(),
        }
    }
}

impl fmt::Display for Guest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.phone)
    }
}
