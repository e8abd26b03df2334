use regex::Regex;
use std::sync::LazyLock;

use crate::{CoreError, CoreResult};

// Two letters, two digits, a space, five digits: "UP32 12345".
static REGISTRATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[0-9]{2} [0-9]{5}$").expect("registration pattern"));

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("phone pattern"));

pub const INVALID_REGISTRATION: &str = "Invalid registration number format! Use: UP32 12345";
pub const INVALID_PHONE: &str = "Invalid mobile number! Must be 10 digits.";

pub fn validate_registration(registration: &str) -> CoreResult<()> {
    if REGISTRATION.is_match(registration) {
        Ok(())
    } else {
        Err(CoreError::ValidationError(INVALID_REGISTRATION.to_string()))
    }
}

pub fn validate_phone(phone: &str) -> CoreResult<()> {
    if PHONE.is_match(phone) {
        Ok(())
    } else {
        Err(CoreError::ValidationError(INVALID_PHONE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_format() {
        assert!(validate_registration("UP32 12345").is_ok());
        assert!(validate_registration("DL01 00000").is_ok());

        for bad in [
            "",
            "up32 12345",
            "UP32 1234",
            "UP32 123456",
            "UP3212345",
            "UP32  12345",
            "U32 12345",
            "UP32 12345\n",
            " UP32 12345",
            "UP32-12345",
            "ＵＰ32 12345",
            "UP32 １2345",
        ] {
            assert!(validate_registration(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_phone_is_exactly_ten_digits() {
        assert!(validate_phone("1234567890").is_ok());

        for bad in ["", "123456789", "12345678901", "12345 67890", "123456789a", "+123456789"] {
            assert!(validate_phone(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_error_messages() {
        match validate_phone("12") {
            Err(CoreError::ValidationError(msg)) => assert_eq!(msg, INVALID_PHONE),
            other => panic!("unexpected {:?}", other),
        }
    }
}
