use rust_decimal::Decimal;

pub const MAX_TEXT_FIELD_CHARS: usize = 120;
pub const MAX_NOTES_CHARS: usize = 2000;
pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MAX_PASSWORD_BYTES: usize = 512;
pub const MIN_BUDGET_YEAR: i32 = 2000;

#[derive(Debug, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(String),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    /// Converts into a `Result` so that checks can be chained with `?`.
    pub fn into_result(self) -> Result<(), String> {
        match self {
            Validity::Valid => Ok(()),
            Validity::Invalid(msg) => Err(msg),
        }
    }
}

pub fn validate_email_address(email: &str) -> Validity {
    if email.chars().count() > 320 {
        return Validity::Invalid(String::from("Email address is too long."));
    }

    if email.chars().any(|c| c == ' ' || !c.is_ascii()) {
        return Validity::Invalid(String::from(
            "Email address cannot contain spaces or non-ASCII characters.",
        ));
    }

    if email.contains("@.") {
        return Validity::Invalid(String::from(
            "Domain name in email address cannot begin with a period.",
        ));
    }

    let Some((username, domain)) = email.split_once('@') else {
        return Validity::Invalid(String::from("Email address must contain an at symbol (@)."));
    };

    if username.is_empty() || domain.len() < 3 {
        return Validity::Invalid(String::from("Email username or domain name is too short."));
    }

    if domain.contains('@') || !domain.contains('.') {
        return Validity::Invalid(String::from(
            "Email address must have only one at symbol (@) and the domain must contain a period.",
        ));
    }

    if domain.ends_with('.') {
        return Validity::Invalid(String::from("Email address cannot end with a period."));
    }

    Validity::Valid
}

/// Checks a required free-text field such as a name, category, or description. The value
/// is checked after trimming.
pub fn validate_text_field(field_name: &str, value: &str) -> Validity {
    let value = value.trim();

    if value.is_empty() {
        return Validity::Invalid(format!("{field_name} is required."));
    }

    if value.chars().count() > MAX_TEXT_FIELD_CHARS {
        return Validity::Invalid(format!(
            "{field_name} cannot be longer than {MAX_TEXT_FIELD_CHARS} characters."
        ));
    }

    Validity::Valid
}

pub fn validate_notes(notes: &str) -> Validity {
    if notes.chars().count() > MAX_NOTES_CHARS {
        return Validity::Invalid(format!(
            "Notes cannot be longer than {MAX_NOTES_CHARS} characters."
        ));
    }

    Validity::Valid
}

pub fn validate_amount(amount: Decimal) -> Validity {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Validity::Invalid(String::from("Amount cannot be negative."));
    }

    if amount.normalize().scale() > 2 {
        return Validity::Invalid(String::from(
            "Amount cannot have more than two decimal places.",
        ));
    }

    Validity::Valid
}

pub fn validate_month(month: i16) -> Validity {
    if !(1..=12).contains(&month) {
        return Validity::Invalid(String::from("Month must be between 1 and 12."));
    }

    Validity::Valid
}

pub fn validate_year(year: i32) -> Validity {
    if year < MIN_BUDGET_YEAR {
        return Validity::Invalid(format!("Year must be {MIN_BUDGET_YEAR} or later."));
    }

    Validity::Valid
}

pub fn validate_password(password: &str) -> Validity {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Validity::Invalid(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters long."
        ));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Validity::Invalid(format!(
            "Password is too long. Max: {MAX_PASSWORD_BYTES} bytes"
        ));
    }

    Validity::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{distributions::Alphanumeric, Rng};
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_email_address() {
        // Valid
        const NORMAL: &str = "test@example.com";
        const WITH_DOT_IN_USERNAME: &str = "test.me@example.com";
        const MULTIPLE_DOT_DOMAIN: &str = "email@example.co.jp";
        const PLUS_IN_USERNAME: &str = "firstname+lastname@example.com";
        const IP_DOMAIN: &str = "email@123.123.123.123";
        const NUMERIC_USERNAME: &str = "1234567890@example.co.uk";
        const DASH_IN_DOMAIN: &str = "email@example-one.com";

        assert!(validate_email_address(NORMAL).is_valid());
        assert!(validate_email_address(WITH_DOT_IN_USERNAME).is_valid());
        assert!(validate_email_address(MULTIPLE_DOT_DOMAIN).is_valid());
        assert!(validate_email_address(PLUS_IN_USERNAME).is_valid());
        assert!(validate_email_address(IP_DOMAIN).is_valid());
        assert!(validate_email_address(NUMERIC_USERNAME).is_valid());
        assert!(validate_email_address(DASH_IN_DOMAIN).is_valid());

        // Invalid
        let mut too_long: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(300)
            .map(char::from)
            .collect();

        too_long.push_str("@example.com");

        const WITH_SPACE: &str = "te st@example.com";
        const NON_ASCII_CHAR: &str = "testé@example.com";
        const MULTIPLE_AT: &str = "test@exam.com@ple.com";
        const NO_AT: &str = "testexample.com";
        const DOMAIN_DOT_ADJACENT_TO_AT: &str = "test@.com";
        const DOT_LAST_CHAR: &str = "test@example.com.";
        const EMPTY_USERNAME: &str = "@example.com";

        assert!(!validate_email_address(&too_long).is_valid());
        assert!(!validate_email_address(WITH_SPACE).is_valid());
        assert!(!validate_email_address(NON_ASCII_CHAR).is_valid());
        assert!(!validate_email_address(MULTIPLE_AT).is_valid());
        assert!(!validate_email_address(NO_AT).is_valid());
        assert!(!validate_email_address(DOMAIN_DOT_ADJACENT_TO_AT).is_valid());
        assert!(!validate_email_address(DOT_LAST_CHAR).is_valid());
        assert!(!validate_email_address(EMPTY_USERNAME).is_valid());
    }

    #[test]
    fn test_validate_text_field() {
        assert!(validate_text_field("Category", "Food").is_valid());
        assert!(validate_text_field("Category", "  Food  ").is_valid());
        assert!(validate_text_field("Description", &"a".repeat(120)).is_valid());

        assert_eq!(
            validate_text_field("Category", "   "),
            Validity::Invalid(String::from("Category is required."))
        );
        assert!(!validate_text_field("Description", "").is_valid());
        assert!(!validate_text_field("Description", &"a".repeat(121)).is_valid());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(dec!(0)).is_valid());
        assert!(validate_amount(dec!(-0)).is_valid());
        assert!(validate_amount(dec!(200)).is_valid());
        assert!(validate_amount(dec!(19.99)).is_valid());
        assert!(validate_amount(dec!(19.990)).is_valid());

        assert!(!validate_amount(dec!(-0.01)).is_valid());
        assert!(!validate_amount(dec!(-50)).is_valid());
        assert!(!validate_amount(dec!(1.005)).is_valid());
    }

    #[test]
    fn test_validate_month_and_year() {
        assert!(validate_month(1).is_valid());
        assert!(validate_month(12).is_valid());
        assert!(!validate_month(0).is_valid());
        assert!(!validate_month(13).is_valid());
        assert!(!validate_month(-3).is_valid());

        assert!(validate_year(2000).is_valid());
        assert!(validate_year(2031).is_valid());
        assert!(!validate_year(1999).is_valid());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("hunter22").is_valid());
        assert!(!validate_password("short").is_valid());
        assert!(!validate_password(&"p".repeat(513)).is_valid());
    }

    #[test]
    fn test_into_result() {
        assert_eq!(Validity::Valid.into_result(), Ok(()));
        assert_eq!(
            Validity::Invalid(String::from("nope")).into_result(),
            Err(String::from("nope"))
        );
    }
}
