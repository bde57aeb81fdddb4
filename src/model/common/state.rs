use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the Election lifecycle. Transitions only ever move forward:
/// `Pending -> Active -> Closed`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionState {
    /// Created but not yet open for votes.
    Pending,
    /// Currently accepting votes. At most one election may be
    /// `Pending` or `Active` at any time.
    Active,
    /// Finished, either by reaching its close time or by manual closure.
    /// Immutable from here on.
    Closed,
}

impl From<ElectionState> for Bson {
    fn from(state: ElectionState) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bson_representation_is_lowercase() {
        assert_eq!(Bson::from(ElectionState::Pending), Bson::from("pending"));
        assert_eq!(Bson::from(ElectionState::Active), Bson::from("active"));
        assert_eq!(Bson::from(ElectionState::Closed), Bson::from("closed"));
    }
}
