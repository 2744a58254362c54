use storeledger_core::{DomainError, DomainResult};

pub(crate) fn required_text(field: &str, value: &str, max_len: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    check_len(field, trimmed, max_len)?;
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> DomainResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) => {
            let trimmed = v.trim();
            check_len(field, trimmed, max_len)?;
            Ok(Some(trimmed.to_string()))
        }
    }
}

pub(crate) fn email(value: &str) -> DomainResult<String> {
    let trimmed = required_text("email", value, 254)?;
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(DomainError::validation(format!("invalid email address: {trimmed}")));
    }
    Ok(trimmed.to_lowercase())
}

fn check_len(field: &str, value: &str, max_len: usize) -> DomainResult<()> {
    if value.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_optional_text_becomes_none() {
        assert_eq!(optional_text("phone", Some("   ".into()), 15).unwrap(), None);
    }

    #[test]
    fn email_requires_domain_with_dot() {
        assert!(email("ana@shop.es").is_ok());
        assert!(email("ana@localhost").is_err());
        assert!(email("@shop.es").is_err());
        assert_eq!(email(" Ana@Shop.ES ").unwrap(), "ana@shop.es");
    }
}
