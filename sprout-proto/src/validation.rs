//! Client-side form checks
//!
//! These run before any network or BLE call is made; a failure blocks the
//! submission and carries one message per offending field.

/// Minimum length of a WPA2 passphrase, also used for account passwords
pub const MIN_PASSWORD_LEN: usize = 8;

const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
    Ssid,
    WifiPassword,
    PlantName,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirmPassword",
            Field::Ssid => "ssid",
            Field::WifiPassword => "wifiPassword",
            Field::PlantName => "plantName",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// One or more fields failed their checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: Field, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field,
                message: message.into(),
            }],
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Message for a specific field, for inline display next to the input
    pub fn message_for(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for e in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", e.field.as_str(), e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Collects field errors, then turns into `Ok(())` or a `ValidationError`
#[derive(Debug, Default)]
struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    fn fail(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: self.errors,
            })
        }
    }
}

/// Not empty once surrounding whitespace is removed
pub fn is_not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Accepts `local@domain.tld` shaped addresses: one `@`, no whitespace,
/// and a dot inside the domain part.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Rules for account passwords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_number: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LEN,
            require_uppercase: false,
            require_lowercase: false,
            require_number: false,
            require_special: false,
        }
    }
}

impl PasswordPolicy {
    /// Policy applied on the registration form
    pub fn registration() -> Self {
        Self {
            require_number: true,
            ..Self::default()
        }
    }

    /// Returns the first rule the password breaks
    pub fn check(&self, password: &str) -> Result<(), String> {
        if password.chars().count() < self.min_length {
            return Err(format!(
                "Password must be at least {} characters long",
                self.min_length
            ));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            return Err("Password must contain at least one uppercase letter".to_string());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            return Err("Password must contain at least one lowercase letter".to_string());
        }
        if self.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err("Password must contain at least one number".to_string());
        }
        if self.require_special && !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
            return Err("Password must contain at least one special character".to_string());
        }
        Ok(())
    }
}

/// WiFi form: network name and passphrase
pub fn validate_wifi(ssid: &str, password: &str) -> Result<(), ValidationError> {
    let mut checks = Checks::default();

    if !is_not_blank(ssid) {
        checks.fail(Field::Ssid, "WiFi name is required");
    }

    if !is_not_blank(password) {
        checks.fail(Field::WifiPassword, "WiFi password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        checks.fail(
            Field::WifiPassword,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }

    checks.finish()
}

/// Login form
pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    let mut checks = Checks::default();
    check_email(&mut checks, email);
    if password.is_empty() {
        checks.fail(Field::Password, "Password is required");
    }
    checks.finish()
}

/// Registration form, including the confirmation field
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    let mut checks = Checks::default();

    if !is_not_blank(name) {
        checks.fail(Field::Name, "Name is required");
    }
    check_email(&mut checks, email);
    if let Err(message) = PasswordPolicy::registration().check(password) {
        checks.fail(Field::Password, message);
    }
    if password != confirm_password {
        checks.fail(Field::ConfirmPassword, "Passwords do not match");
    }

    checks.finish()
}

/// Fields sent when creating an account: the minimum the API accepts
pub fn validate_new_account(name: &str, email: &str, password: &str) -> Result<(), ValidationError> {
    let mut checks = Checks::default();

    if !is_not_blank(name) {
        checks.fail(Field::Name, "Name is required");
    }
    check_email(&mut checks, email);
    if let Err(message) = PasswordPolicy::default().check(password) {
        checks.fail(Field::Password, message);
    }

    checks.finish()
}

/// Plant details form
pub fn validate_plant_name(display_name: &str) -> Result<(), ValidationError> {
    if is_not_blank(display_name) {
        Ok(())
    } else {
        Err(ValidationError::single(
            Field::PlantName,
            "Please give your plant a name",
        ))
    }
}

fn check_email(checks: &mut Checks, email: &str) {
    if !is_not_blank(email) {
        checks.fail(Field::Email, "Email is required");
    } else if !is_valid_email(email.trim()) {
        checks.fail(Field::Email, "Email is invalid");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        for ok in ["a@b.com", "first.last@mail.example.org", "x@y.z"] {
            assert!(is_valid_email(ok), "{ok}");
        }
        for bad in ["", "a@b", "a@.com", "a@b.", "@b.com", "a b@c.com", "a@b@c.com", "ab.com"] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }

    #[test]
    fn wifi_short_password_rejected() {
        let err = validate_wifi("home", "1234567").unwrap_err();
        assert_eq!(
            err.message_for(Field::WifiPassword),
            Some("Password must be at least 8 characters")
        );
        assert!(err.message_for(Field::Ssid).is_none());

        assert!(validate_wifi("home", "12345678").is_ok());
    }

    #[test]
    fn wifi_empty_fields_both_reported() {
        let err = validate_wifi("   ", "").unwrap_err();
        assert_eq!(err.message_for(Field::Ssid), Some("WiFi name is required"));
        assert_eq!(
            err.message_for(Field::WifiPassword),
            Some("WiFi password is required")
        );
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn wifi_password_counts_characters_not_bytes() {
        // 8 characters, 16 bytes
        assert!(validate_wifi("home", "ééééééé1").is_ok());
        // 7 characters, 14 bytes
        assert!(validate_wifi("home", "éééééé1").is_err());
    }

    #[test]
    fn login_form() {
        let err = validate_login("", "").unwrap_err();
        assert_eq!(err.message_for(Field::Email), Some("Email is required"));
        assert_eq!(err.message_for(Field::Password), Some("Password is required"));

        let err = validate_login("nope", "pw").unwrap_err();
        assert_eq!(err.message_for(Field::Email), Some("Email is invalid"));

        assert!(validate_login("a@b.com", "pw").is_ok());
    }

    #[test]
    fn registration_form() {
        let err = validate_registration("", "a@b.com", "password", "passw0rd").unwrap_err();
        assert_eq!(err.message_for(Field::Name), Some("Name is required"));
        assert_eq!(
            err.message_for(Field::Password),
            Some("Password must contain at least one number")
        );
        assert_eq!(
            err.message_for(Field::ConfirmPassword),
            Some("Passwords do not match")
        );

        assert!(validate_registration("Ana", "a@b.com", "passw0rd", "passw0rd").is_ok());
    }

    #[test]
    fn new_account_needs_only_length() {
        assert!(validate_new_account("Ana", "a@b.com", "password").is_ok());

        let err = validate_new_account(" ", "a@b", "short").unwrap_err();
        assert_eq!(err.errors().len(), 3);
        assert_eq!(
            err.message_for(Field::Password),
            Some("Password must be at least 8 characters long")
        );
    }

    #[test]
    fn password_policy_rules() {
        let strict = PasswordPolicy {
            min_length: 4,
            require_uppercase: true,
            require_lowercase: true,
            require_number: true,
            require_special: true,
        };
        assert!(strict.check("abc").is_err());
        assert!(strict.check("abcd1!").unwrap_err().contains("uppercase"));
        assert!(strict.check("ABCD1!").unwrap_err().contains("lowercase"));
        assert!(strict.check("ABcd!!").unwrap_err().contains("number"));
        assert!(strict.check("ABcd12").unwrap_err().contains("special"));
        assert!(strict.check("ABcd1!").is_ok());
    }

    #[test]
    fn display_lists_every_field() {
        let err = validate_wifi("", "").unwrap_err();
        assert_eq!(
            err.to_string(),
            "ssid: WiFi name is required; wifiPassword: WiFi password is required"
        );
    }
}
