use chrono::{Datelike, Utc};

/// Oldest construction year still accepted for a registered ship.
const MIN_CONSTRUCTION_YEAR: i32 = 1800;

pub fn construction_year(year: i32) -> Result<(), String> {
    let current_year = Utc::now().year();
    if year > current_year {
        return Err("Construction year cannot be in the future.".to_string());
    }
    if year < MIN_CONSTRUCTION_YEAR {
        return Err("Construction year seems too old.".to_string());
    }
    Ok(())
}

pub fn non_negative_price(value: f64, label: &str) -> Result<(), String> {
    if value < 0.0 {
        return Err(format!("{} cannot be negative.", label));
    }
    Ok(())
}

pub fn positive_seat_number(number: i32) -> Result<(), String> {
    if number <= 0 {
        return Err("Seat number must be positive.".to_string());
    }
    Ok(())
}

pub fn distinct_route_ends(origin: &str, destiny: &str) -> Result<(), String> {
    if origin == destiny {
        return Err("Origin and destiny cannot be the same.".to_string());
    }
    Ok(())
}

pub fn max_length(value: &str, limit: usize, label: &str) -> Result<(), String> {
    if value.chars().count() > limit {
        return Err(format!("{} cannot exceed {} characters.", label, limit));
    }
    Ok(())
}

pub fn passwords_match(password: &str, password2: &str) -> Result<(), String> {
    if password != password2 {
        return Err("Passwords do not match.".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_year_bounds() {
        let next_year = Utc::now().year() + 1;
        assert!(construction_year(next_year).is_err());
        assert!(construction_year(1799).is_err());
        assert!(construction_year(1950).is_ok());
        assert!(construction_year(Utc::now().year()).is_ok());
    }

    #[test]
    fn test_route_ends_must_differ() {
        assert!(distinct_route_ends("Palma", "Palma").is_err());
        assert!(distinct_route_ends("Palma", "Ibiza").is_ok());
    }

    #[test]
    fn test_price_and_seat_number() {
        assert!(non_negative_price(-0.01, "Base price").is_err());
        assert!(non_negative_price(0.0, "Base price").is_ok());
        assert!(positive_seat_number(0).is_err());
        assert!(positive_seat_number(-3).is_err());
        assert!(positive_seat_number(1).is_ok());
    }

    #[test]
    fn test_passwords_match() {
        assert!(passwords_match("s3cret", "s3cret").is_ok());
        assert!(passwords_match("s3cret", "S3cret").is_err());
    }

    #[test]
    fn test_max_length() {
        assert!(max_length("123456789012345", 15, "Phone number").is_ok());
        assert!(max_length("1234567890123456", 15, "Phone number").is_err());
    }
}
