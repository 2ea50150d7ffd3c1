pub mod claims;
pub mod guard;
pub mod onboarding;
pub mod session;
