use lazy_static::lazy_static;
use regex::Regex;

use crate::entities::booking::PassengerDetail;
use crate::error::{AppError, AppResult};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\d{10}$").unwrap();
    static ref AADHAAR_RE: Regex = Regex::new(r"^\d{12}$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_RIDE_SEATS: i32 = 8;

pub fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::Validation(format!("Invalid email address: {}", email)));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// A booking carries exactly one passenger record per seat.
pub fn validate_passengers(seats_booked: i32, passengers: &[PassengerDetail]) -> AppResult<()> {
    if seats_booked < 1 {
        return Err(AppError::Validation("Must book at least 1 seat".to_string()));
    }
    if passengers.len() != seats_booked as usize {
        return Err(AppError::Validation(format!(
            "Expected {} passenger details, got {}",
            seats_booked,
            passengers.len()
        )));
    }

    for (i, p) in passengers.iter().enumerate() {
        require_non_empty(&format!("passengers[{}].name", i), &p.name)?;
        if !AADHAAR_RE.is_match(&p.aadhaar_number) {
            return Err(AppError::Validation(format!(
                "passengers[{}].aadhaarNumber must be 12 digits",
                i
            )));
        }
        if !PHONE_RE.is_match(&p.phone) {
            return Err(AppError::Validation(format!(
                "passengers[{}].phone must be 10 digits",
                i
            )));
        }
        validate_email(&p.email)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passenger() -> PassengerDetail {
        PassengerDetail {
            name: "Asha".into(),
            aadhaar_number: "123412341234".into(),
            phone: "9876543210".into(),
            email: "asha@example.com".into(),
        }
    }

    #[test]
    fn one_record_per_seat() {
        assert!(validate_passengers(1, &[passenger()]).is_ok());
        assert!(validate_passengers(2, &[passenger()]).is_err());
        assert!(validate_passengers(0, &[]).is_err());
    }

    #[test]
    fn identity_document_must_be_twelve_digits() {
        let mut p = passenger();
        p.aadhaar_number = "1234".into();
        let err = validate_passengers(1, &[p]).unwrap_err();
        assert!(err.to_string().contains("aadhaarNumber"));
    }

    #[test]
    fn phone_must_be_ten_digits() {
        let mut p = passenger();
        p.phone = "+91-98765".into();
        assert!(validate_passengers(1, &[p]).is_err());
    }

    #[test]
    fn email_and_password_rules() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
    }
}
