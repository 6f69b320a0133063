use crate::api::ShopClient;
use crate::auth::{TokenStore, decode_claims};
use crate::error::ShopError;
use crate::types::{Credentials, RegisteredUser, Registration, Role};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials and try again.";
pub const REGISTER_FAILED: &str = "Registration failed. Please try again.";
pub const PASSWORDS_MISMATCH: &str = "Passwords do not match.";
pub const REGISTER_SUCCESS: &str = "Registration successful! Please log in.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    Login,
    Register,
}

/// Fields and feedback of the login/registration form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub mode: FormMode,
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub error: Option<String>,
    pub success: Option<String>,
    pub loading: bool,
}

impl LoginForm {
    pub fn submit_label(&self) -> &'static str {
        match (self.mode, self.loading) {
            (FormMode::Login, false) => "Login",
            (FormMode::Login, true) => "Logging in...",
            (FormMode::Register, false) => "Register",
            (FormMode::Register, true) => "Registering...",
        }
    }

    pub fn toggle_label(&self) -> &'static str {
        match self.mode {
            FormMode::Login => "Need an account? Register Here.",
            FormMode::Register => "Already have an account? Login Here.",
        }
    }

    fn clear_feedback(&mut self) {
        self.error = None;
        self.success = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Token stored; the caller should move on to the dashboard.
    LoggedIn { role: Option<Role> },
    /// Account created; the form is back in login mode.
    Registered(RegisteredUser),
}

/// Controller behind the login screen.
pub struct Session {
    client: ShopClient,
    store: Arc<dyn TokenStore>,
    form: LoginForm,
}

impl Session {
    pub fn new(client: ShopClient, store: Arc<dyn TokenStore>) -> Self {
        Self {
            client,
            store,
            form: LoginForm::default(),
        }
    }

    pub fn form(&self) -> &LoginForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut LoginForm {
        &mut self.form
    }

    /// Switch between login and registration, resetting every field.
    pub fn toggle_mode(&mut self) {
        let mode = match self.form.mode {
            FormMode::Login => FormMode::Register,
            FormMode::Register => FormMode::Login,
        };
        self.form = LoginForm {
            mode,
            ..LoginForm::default()
        };
    }

    pub async fn submit(&mut self) -> Result<SubmitOutcome, ShopError> {
        match self.form.mode {
            FormMode::Login => self.login().await,
            FormMode::Register => self.register().await.map(SubmitOutcome::Registered),
        }
    }

    pub async fn login(&mut self) -> Result<SubmitOutcome, ShopError> {
        if self.form.loading {
            return Err(ShopError::Busy);
        }
        self.form.clear_feedback();
        self.form.loading = true;

        let creds = Credentials {
            username: self.form.username.clone(),
            password: self.form.password.clone(),
        };
        let result = self.client.login(&creds).await.and_then(|token| {
            self.store.save(&token.access_token)?;
            Ok(token.access_token)
        });
        self.form.loading = false;

        match result {
            Ok(token) => {
                let role = crate::auth::role_of(&token);
                self.client.set_token(Some(token));
                Ok(SubmitOutcome::LoggedIn { role })
            }
            Err(e) => {
                warn!(username = %creds.username, error = %e, "login failed");
                self.form.error = Some(e.detail().unwrap_or(LOGIN_FAILED).to_string());
                Err(e)
            }
        }
    }

    /// Register a customer account. Admin accounts are not created from the client.
    pub async fn register(&mut self) -> Result<RegisteredUser, ShopError> {
        if self.form.loading {
            return Err(ShopError::Busy);
        }
        self.form.clear_feedback();

        if self.form.password != self.form.confirm_password {
            self.form.error = Some(PASSWORDS_MISMATCH.to_string());
            return Err(ShopError::InvalidInput(PASSWORDS_MISMATCH.to_string()));
        }
        self.form.loading = true;

        let email = self.form.email.trim();
        let registration = Registration {
            username: self.form.username.clone(),
            email: (!email.is_empty()).then(|| email.to_string()),
            password: self.form.password.clone(),
            role: Role::Customer,
        };
        let result = self.client.register(&registration).await;
        self.form.loading = false;

        match result {
            Ok(user) => {
                self.form.success = Some(REGISTER_SUCCESS.to_string());
                self.form.mode = FormMode::Login;
                self.form.password.clear();
                self.form.confirm_password.clear();
                Ok(user)
            }
            Err(e) => {
                warn!(username = %registration.username, error = %e, "registration failed");
                self.form.error = Some(e.detail().unwrap_or(REGISTER_FAILED).to_string());
                Err(e)
            }
        }
    }

    pub fn logout(&mut self) -> Result<(), ShopError> {
        self.store.clear()?;
        self.client.set_token(None);
        info!("logged out");
        Ok(())
    }
}

/// Stored token, unless it is missing or already expired. Expired tokens are removed.
pub fn stored_token(store: &dyn TokenStore) -> Result<Option<String>, ShopError> {
    let Some(token) = store.load()? else {
        return Ok(None);
    };
    if let Ok(claims) = decode_claims(&token)
        && claims.is_expired_at(Utc::now())
    {
        info!(
            expired_at = ?claims.expires_at(),
            "stored token has expired; discarding"
        );
        store.clear()?;
        return Ok(None);
    }
    Ok(Some(token))
}
