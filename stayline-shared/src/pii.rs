use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Guest contact data (email, phone) that must never appear verbatim in logs.
///
/// `Debug` and `Display` print a mask; serialization writes the real value so
/// API responses and storage are unaffected.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> From<T> for Masked<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_log_output() {
        let email = Masked::new("guest@example.com".to_string());
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(format!("{}", email), "********");
        assert_eq!(email.expose(), "guest@example.com");
    }

    #[test]
    fn test_masked_serializes_real_value() {
        let phone = Masked::new("+62 811 000".to_string());
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"+62 811 000\"");

        let back: Masked<String> = serde_json::from_str("\"+1 555\"").unwrap();
        assert_eq!(back.into_inner(), "+1 555");
    }
}
