//! Form validation for the contact and newsletter forms. Nothing is sent
//! anywhere; a form that fails validation never gets to submission.

use std::fmt;

/// A contact form field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Subject,
    Message,
}

impl Field {
    /// The form control's `name`.
    pub fn name(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Subject => "subject",
            Field::Message => "message",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// These required fields are blank.
    MissingFields(Vec<Field>),

    /// The address doesn't look like `local@domain.tld`.
    InvalidEmail(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::MissingFields(_) => {
                f.write_str("Please fill out all required fields.")
            }
            ValidationError::InvalidEmail(_) => f.write_str("Please enter a valid email address."),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    /// Checks that every field is filled in. Whitespace doesn't count.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            (Field::Name, &self.name),
            (Field::Email, &self.email),
            (Field::Subject, &self.subject),
            (Field::Message, &self.message),
        ];
        let missing: Vec<Field> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| *field)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing))
        }
    }
}

/// True for `local@domain.tld`: exactly one `@`, no whitespace, a non-empty
/// local part, and a domain with a `.` that has something on both sides.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return false,
    };
    !local.is_empty()
        && domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Validates a newsletter signup, returning the trimmed address.
pub fn subscribe(email: &str) -> Result<&str, ValidationError> {
    let email = email.trim();
    if is_valid_email(email) {
        Ok(email)
    } else {
        Err(ValidationError::InvalidEmail(email.to_owned()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_fields() {
        let form = ContactForm {
            name: "Ada".to_owned(),
            email: "ada@example.org".to_owned(),
            subject: "  ".to_owned(),
            message: String::new(),
        };
        let err = form.validate().unwrap_err();
        assert_eq!(ValidationError::MissingFields(vec![Field::Subject, Field::Message]), err);
        assert_eq!("Please fill out all required fields.", err.to_string());
    }

    #[test]
    fn test_complete_form() {
        let form = ContactForm {
            name: "Ada".to_owned(),
            email: "ada@example.org".to_owned(),
            subject: "Hello".to_owned(),
            message: "Hi there".to_owned(),
        };
        assert_eq!(Ok(()), form.validate());
    }

    #[test]
    fn test_email_shape() {
        for valid in &["a@b.c", "first.last@mail.example.org", "x+tag@d.io"] {
            assert!(is_valid_email(valid), "{}", valid);
        }
        for invalid in &[
            "", "plain", "@b.c", "a@b", "a@.c", "a@b.", "a@@b.c", "a b@c.d", "a@b@c.d",
        ] {
            assert!(!is_valid_email(invalid), "{}", invalid);
        }
    }

    #[test]
    fn test_subscribe_trims() {
        assert_eq!(Ok("ada@example.org"), subscribe("  ada@example.org "));
        assert!(matches!(subscribe("nope"), Err(ValidationError::InvalidEmail(_))));
    }
}
