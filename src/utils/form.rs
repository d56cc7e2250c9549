use crate::core::error::ValidationError;
use serde::de::DeserializeOwned;

/// Decode an `application/x-www-form-urlencoded` request body
pub fn parse_form<T: DeserializeOwned>(body: &[u8]) -> Result<T, ValidationError> {
    serde_urlencoded::from_bytes(body).map_err(|e| ValidationError::MalformedForm(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forms::{RegisterForm, ReactivateEmailForm};

    #[test]
    fn test_parse_form_decodes_fields() {
        let form: RegisterForm =
            parse_form(b"email=a%40x.com&company_name=Acme+Ltd&password=secret123").unwrap();
        assert_eq!(form.email, "a@x.com");
        assert_eq!(form.company_name, "Acme Ltd");
        assert_eq!(form.password, "secret123");
    }

    #[test]
    fn test_parse_form_missing_optional_fields_default() {
        let form: RegisterForm = parse_form(b"email=a%40x.com").unwrap();
        assert!(form.company_name.is_empty());
        assert!(form.password.is_empty());
    }

    #[test]
    fn test_parse_form_missing_required_field() {
        let result: Result<ReactivateEmailForm, _> = parse_form(b"");
        assert!(matches!(result, Err(ValidationError::MalformedForm(_))));
    }
}
