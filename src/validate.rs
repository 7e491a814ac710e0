use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,6}$").expect("email regex");
    static ref NAME_RE: Regex = Regex::new(r"^[a-zA-Z\s]+$").expect("name regex");
    static ref ALNUM_RE: Regex = Regex::new(r"^[a-zA-Z0-9]+$").expect("alnum regex");
}

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Length >= 8 with at least one lowercase, one uppercase, and one digit.
/// The original rule is a lookahead regex; the acceptance set is identical.
pub fn valid_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn valid_full_name(name: &str) -> bool {
    name.len() >= 3 && NAME_RE.is_match(name)
}

pub fn valid_student_id(id: &str) -> bool {
    (6..=10).contains(&id.len()) && ALNUM_RE.is_match(id)
}

pub fn valid_admin_code(code: &str) -> bool {
    (8..=12).contains(&code.len()) && ALNUM_RE.is_match(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

/// Advisory score: one criterion each for length >= 8, lowercase, uppercase,
/// digit, and symbol. <=2 weak, 3 medium, otherwise strong.
pub fn password_strength(password: &str) -> Option<(Strength, u8)> {
    if password.is_empty() {
        return None;
    }
    let mut score = 0u8;
    if password.len() >= 8 {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 1;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 1;
    }
    let strength = if score <= 2 {
        Strength::Weak
    } else if score == 3 {
        Strength::Medium
    } else {
        Strength::Strong
    };
    Some((strength, score))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
    FullName,
    StudentId,
    AdminCode,
}

impl Field {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "email" => Some(Field::Email),
            "password" => Some(Field::Password),
            "fullName" => Some(Field::FullName),
            "studentId" => Some(Field::StudentId),
            "adminCode" => Some(Field::AdminCode),
            _ => None,
        }
    }
}

/// Field-scoped check driving the inline form messages. Empty input gets the
/// required-message; invalid input gets the rule's message.
pub fn check_field(field: Field, value: &str) -> Result<(), &'static str> {
    match field {
        Field::Email => {
            if value.is_empty() {
                Err("Email is required")
            } else if !valid_email(value) {
                Err("Please enter a valid email address")
            } else {
                Ok(())
            }
        }
        Field::Password => {
            if value.is_empty() {
                Err("Password is required")
            } else if !valid_password(value) {
                Err("Password must be at least 8 characters with uppercase, lowercase, and number")
            } else {
                Ok(())
            }
        }
        Field::FullName => {
            if value.is_empty() {
                Err("Full name is required")
            } else if !valid_full_name(value) {
                Err("Name must contain only letters and spaces (min 3 characters)")
            } else {
                Ok(())
            }
        }
        Field::StudentId => {
            if value.is_empty() {
                Err("Student ID is required")
            } else if !valid_student_id(value) {
                Err("Student ID must be 6-10 alphanumeric characters")
            } else {
                Ok(())
            }
        }
        Field::AdminCode => {
            if value.is_empty() {
                Err("Admin code is required")
            } else if !valid_admin_code(value) {
                Err("Admin code must be 8-12 alphanumeric characters")
            } else {
                Ok(())
            }
        }
    }
}
