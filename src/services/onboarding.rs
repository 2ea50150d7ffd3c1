//! Tenant onboarding form validation.
//!
//! DESIGN
//! ======
//! Validation runs every field rule and collects one message per field. For
//! fields with several rules the later failing rule's message wins, so a
//! tenant ID that is both too short and contains a space reports the length
//! problem. A form that passes produces the trimmed [`OnboardingRequest`]
//! that goes on the wire; the raw form is never sent.
//!
//! Lengths count characters, not bytes.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const FORM_INVALID_MESSAGE: &str = "Please correct the errors in the form.";

/// Characters accepted as the password's "special" class.
pub const PASSWORD_SPECIALS: &str = "!@#$%^&+=";

static TENANT_ID_RE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"^[a-zA-Z0-9_-]+$"));
static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"\S+@\S+\.\S+"));

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(error = %e, pattern, "validation pattern failed to compile");
            None
        }
    }
}

fn matches(re: &LazyLock<Option<Regex>>, value: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(value))
}

// =============================================================================
// FIELDS
// =============================================================================

/// Form fields, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OnboardingField {
    TenantId,
    TenantName,
    ContactEmail,
    Phone,
    SubDomain,
    Username,
    Password,
    UserEmail,
    FullName,
}

impl OnboardingField {
    pub const ALL: [Self; 9] = [
        Self::TenantId,
        Self::TenantName,
        Self::ContactEmail,
        Self::Phone,
        Self::SubDomain,
        Self::Username,
        Self::Password,
        Self::UserEmail,
        Self::FullName,
    ];

    /// Wire name of the field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TenantId => "tenantId",
            Self::TenantName => "tenantName",
            Self::ContactEmail => "contactEmail",
            Self::Phone => "phone",
            Self::SubDomain => "subDomain",
            Self::Username => "username",
            Self::Password => "password",
            Self::UserEmail => "userEmail",
            Self::FullName => "fullName",
        }
    }
}

impl fmt::Display for OnboardingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field validation messages. At most one message per field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<OnboardingField, &'static str>,
}

impl FieldErrors {
    #[must_use]
    pub fn get(&self, field: OnboardingField) -> Option<&'static str> {
        self.errors.get(&field).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OnboardingField, &'static str)> + '_ {
        self.errors.iter().map(|(field, message)| (*field, *message))
    }

    fn set(&mut self, field: OnboardingField, message: &'static str) {
        self.errors.insert(field, message);
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(FORM_INVALID_MESSAGE)?;
        for (field, message) in self.iter() {
            write!(f, "\n  {field}: {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

// =============================================================================
// FORM
// =============================================================================

/// Raw form input, exactly as typed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct OnboardingForm {
    pub tenant_id: String,
    pub tenant_name: String,
    pub contact_email: String,
    pub phone: String,
    pub sub_domain: String,
    pub username: String,
    pub password: String,
    pub user_email: String,
    pub full_name: String,
}

impl fmt::Debug for OnboardingForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnboardingForm")
            .field("tenant_id", &self.tenant_id)
            .field("tenant_name", &self.tenant_name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Validated onboarding payload for `POST /api/onboard-tenant`.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    pub tenant_id: String,
    pub tenant_name: String,
    pub contact_email: String,
    pub phone: Option<String>,
    pub sub_domain: Option<String>,
    pub username: String,
    pub password: String,
    pub user_email: String,
    pub full_name: String,
}

impl fmt::Debug for OnboardingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnboardingRequest")
            .field("tenant_id", &self.tenant_id)
            .field("tenant_name", &self.tenant_name)
            .field("contact_email", &self.contact_email)
            .field("phone", &self.phone)
            .field("sub_domain", &self.sub_domain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("user_email", &self.user_email)
            .field("full_name", &self.full_name)
            .finish()
    }
}

impl OnboardingForm {
    /// Check every field; on success return the trimmed request.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] with one message per failing field.
    pub fn validate(&self) -> Result<OnboardingRequest, FieldErrors> {
        let errors = self.field_errors();
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(OnboardingRequest {
            tenant_id: self.tenant_id.trim().to_owned(),
            tenant_name: self.tenant_name.trim().to_owned(),
            contact_email: self.contact_email.trim().to_owned(),
            phone: optional(&self.phone),
            sub_domain: optional(&self.sub_domain),
            username: self.username.trim().to_owned(),
            password: self.password.trim().to_owned(),
            user_email: self.user_email.trim().to_owned(),
            full_name: self.full_name.trim().to_owned(),
        })
    }

    /// Messages for every failing field; empty when the form is valid.
    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();

        let tenant_id = self.tenant_id.trim();
        if tenant_id.is_empty() {
            errors.set(OnboardingField::TenantId, "Tenant ID is required.");
        } else if !matches(&TENANT_ID_RE, tenant_id) {
            errors.set(
                OnboardingField::TenantId,
                "Tenant ID can only contain letters, numbers, hyphens, and underscores.",
            );
        }
        if !length_within(tenant_id, 3, 50) {
            errors.set(OnboardingField::TenantId, "Tenant ID must be between 3 and 50 characters.");
        }

        let tenant_name = self.tenant_name.trim();
        if tenant_name.is_empty() {
            errors.set(OnboardingField::TenantName, "Tenant Name is required.");
        }
        if !length_within(tenant_name, 2, 100) {
            errors.set(OnboardingField::TenantName, "Tenant name must be between 2 and 100 characters.");
        }

        if let Some(message) = email_error(&self.contact_email, "Contact Email is required.", "Email is not valid.") {
            errors.set(OnboardingField::ContactEmail, message);
        }

        let username = self.username.trim();
        if username.is_empty() {
            errors.set(OnboardingField::Username, "User Username is required.");
        }
        if !length_within(username, 3, 50) {
            errors.set(OnboardingField::Username, "Username must be between 3 and 50 characters.");
        }

        if let Some(message) = password_error(&self.password) {
            errors.set(OnboardingField::Password, message);
        }

        if let Some(message) = email_error(&self.user_email, "User Email is required.", "User Email is not valid.") {
            errors.set(OnboardingField::UserEmail, message);
        }

        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            errors.set(OnboardingField::FullName, "User Full Name is required.");
        }
        if !length_within(full_name, 2, 100) {
            errors.set(OnboardingField::FullName, "Full name must be between 2 and 100 characters.");
        }

        errors
    }
}

// =============================================================================
// RULES
// =============================================================================

fn length_within(value: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&value.chars().count())
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn email_error(value: &str, required: &'static str, invalid: &'static str) -> Option<&'static str> {
    if value.trim().is_empty() {
        Some(required)
    } else if !is_email(value) {
        Some(invalid)
    } else {
        None
    }
}

/// Loose address check: something, `@`, something, `.`, something.
#[must_use]
pub fn is_email(value: &str) -> bool {
    matches(&EMAIL_RE, value)
}

fn password_error(password: &str) -> Option<&'static str> {
    if password.trim().is_empty() {
        Some("User Password is required.")
    } else if password.chars().count() < 8 {
        Some("Password must be at least 8 characters long.")
    } else if !is_strong_password(password) {
        Some("Password must contain at least one digit, one lowercase, one uppercase, and one special character.")
    } else {
        None
    }
}

/// At least one digit, lowercase, uppercase and special character, and no
/// whitespace anywhere.
#[must_use]
pub fn is_strong_password(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
        && !password.chars().any(char::is_whitespace)
}

#[cfg(test)]
#[path = "onboarding_test.rs"]
mod tests;
