//! Stubbed local login flow.
//!
//! Holds accounts in memory for the lifetime of the process; there is no
//! identity provider behind it. Validation failures come back as
//! [`InputError`] and are rendered inline like every other user-facing error.

use shared::error::InputError;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Account {
    pub email: String,
    pub display_name: String,
    password: String,
}

#[derive(Default)]
pub struct AuthManager {
    accounts: HashMap<String, Account>,
    current: Option<String>,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        email: &str,
        display_name: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), InputError> {
        if email.trim().is_empty() {
            return Err(InputError::MissingField("email"));
        }
        if display_name.trim().is_empty() {
            return Err(InputError::MissingField("name"));
        }
        if password.is_empty() {
            return Err(InputError::MissingField("password"));
        }
        if password != confirm_password {
            return Err(InputError::PasswordMismatch);
        }

        let email = email.trim().to_lowercase();
        self.accounts.insert(
            email.clone(),
            Account {
                email: email.clone(),
                display_name: display_name.trim().to_string(),
                password: password.to_string(),
            },
        );
        self.current = Some(email);
        Ok(())
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> Result<(), InputError> {
        let email = email.trim().to_lowercase();
        let account = self
            .accounts
            .get(&email)
            .ok_or_else(|| InputError::UnknownAccount(email.clone()))?;
        if account.password != password {
            return Err(InputError::WrongPassword);
        }
        self.current = Some(email);
        Ok(())
    }

    pub fn sign_out(&mut self) {
        self.current = None;
    }

    pub fn current_user(&self) -> Option<&Account> {
        self.current
            .as_ref()
            .and_then(|email| self.accounts.get(email))
    }
}
