use anyhow::{bail, Result};
use shared_types::{CreateInsurerRequest, CreateUserRequest, Period, UpdateInsurerRequest};

/// Insurer codes are exactly three ASCII letters
pub fn validate_insurer_code(codigo: &str) -> Result<()> {
    let codigo = codigo.trim();
    if codigo.len() != 3 || !codigo.chars().all(|c| c.is_ascii_alphabetic()) {
        bail!("Insurer code must be exactly 3 letters");
    }
    Ok(())
}

fn validate_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{} is required", field);
    }
    Ok(())
}

pub fn validate_new_insurer(request: &CreateInsurerRequest) -> Result<()> {
    validate_required("nombre_pergamo", &request.nombre_pergamo)?;
    validate_required("nombre", &request.nombre)?;
    validate_insurer_code(&request.codigo)
}

pub fn validate_insurer_update(request: &UpdateInsurerRequest) -> Result<()> {
    if let Some(nombre_pergamo) = &request.nombre_pergamo {
        validate_required("nombre_pergamo", nombre_pergamo)?;
    }
    if let Some(nombre) = &request.nombre {
        validate_required("nombre", nombre)?;
    }
    if let Some(codigo) = &request.codigo {
        validate_insurer_code(codigo)?;
    }
    Ok(())
}

pub fn validate_name(field: &str, value: &str) -> Result<()> {
    validate_required(field, value)?;
    if value.trim().len() > 200 {
        bail!("{} must be at most 200 characters", field);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < 8 {
        bail!("Password must be at least 8 characters");
    }
    Ok(())
}

pub fn validate_new_user(request: &CreateUserRequest) -> Result<()> {
    let username = request.username.trim();
    if username.is_empty()
        || !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        bail!("Username must contain only letters, numbers, '.', '_' and '-'");
    }
    validate_name("nombre", &request.nombre)?;
    validate_password(&request.password)
}

/// Parses a manual period value; an empty or missing value clears the period
pub fn parse_period_value(value: Option<&str>) -> Result<Option<Period>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => match Period::parse(raw) {
            Some(period) => Ok(Some(period)),
            None => bail!("Invalid period '{}': expected CORRIENTE, REMANENTE or ANULADA", raw),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insurer_code() {
        assert!(validate_insurer_code("NEP").is_ok());
        assert!(validate_insurer_code(" san ").is_ok());
        assert!(validate_insurer_code("NE").is_err());
        assert!(validate_insurer_code("NEPS").is_err());
        assert!(validate_insurer_code("N3P").is_err());
        assert!(validate_insurer_code("ÑEP").is_err());
    }

    #[test]
    fn test_new_user_rules() {
        let mut request = CreateUserRequest {
            username: "ana.perez".to_string(),
            nombre: "Ana Pérez".to_string(),
            password: "suficiente".to_string(),
            rol: None,
        };
        assert!(validate_new_user(&request).is_ok());

        request.password = "corta".to_string();
        assert!(validate_new_user(&request).is_err());

        request.password = "suficiente".to_string();
        request.username = "ana perez".to_string();
        assert!(validate_new_user(&request).is_err());
    }

    #[test]
    fn test_period_value() {
        assert_eq!(parse_period_value(Some("remanente")).unwrap(), Some(Period::Remanente));
        assert_eq!(parse_period_value(Some(" ")).unwrap(), None);
        assert_eq!(parse_period_value(None).unwrap(), None);
        assert!(parse_period_value(Some("VENCIDA")).is_err());
    }
}
