//! Account, signup and profile operations

use super::StatusPayload;
use crate::dispatcher::RequestDispatcher;
use crate::error::{ApiError, ErrorCode, RequestResult};
use crate::operations::documents::{
    CREATE_USER, GET_USER_PROFILE, LOGIN, REGISTER, SEND_OTP_FOR_SIGNUP,
    SEND_PASSWORD_RESET_EMAIL, SEND_PASSWORD_RESET_PHONE, VERIFY_OTP_FOR_SIGNUP,
};
use crate::operations::OperationDocument;
use crate::storage::Credential;
use crate::transport::Variables;
use chrono::NaiveDate;
use log::{error, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Date formats accepted for `dob`; the first is what the backend expects
const DOB_FORMATS: [&str; 2] = ["%d-%m-%Y", "%d/%m/%Y"];

/// Profile fields for `createUser`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    /// `DD/MM/YYYY` or `DD-MM-YYYY`
    pub dob: String,
    pub phone_number: String,
}

impl NewUser {
    /// Variables for `createUser`, with `dob` normalised to `DD-MM-YYYY`
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT` if `dob` is not a calendar date in an accepted
    /// format
    pub fn to_variables(&self) -> RequestResult<Variables> {
        let dob = normalise_dob(&self.dob)?;
        let mut variables = Variables::new();
        for (key, value) in [
            ("firstName", self.first_name.as_str()),
            ("lastName", self.last_name.as_str()),
            ("username", self.username.as_str()),
            ("email", self.email.as_str()),
            ("password", self.password.as_str()),
            ("dob", dob.as_str()),
            ("phoneNumber", self.phone_number.as_str()),
        ] {
            variables.insert(key.to_string(), Value::String(value.to_string()));
        }
        Ok(variables)
    }
}

fn normalise_dob(dob: &str) -> RequestResult<String> {
    DOB_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(dob.trim(), format).ok())
        .map(|date| date.format(DOB_FORMATS[0]).to_string())
        .ok_or_else(|| {
            ApiError::new(
                ErrorCode::InvalidInput,
                "Date of birth must be a valid date in DD/MM/YYYY format.",
            )
        })
}

/// Tokens and identity returned by a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub id_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct LoginPayload {
    #[serde(flatten)]
    status: StatusPayload,
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Tokens and account returned by a successful registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    pub id_token: String,
    pub refresh_token: String,
    pub user: RegisteredUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    dispatcher: RequestDispatcher,
}

impl UserService {
    #[must_use]
    pub fn new(dispatcher: RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        document: &OperationDocument,
        variables: Variables,
    ) -> RequestResult<T> {
        let data = self.dispatcher.execute_document(document, variables).await?;
        document.decode(data)
    }

    async fn acknowledge(
        &self,
        document: &OperationDocument,
        variables: Variables,
        fallback: &str,
    ) -> RequestResult<StatusPayload> {
        let result = self
            .call::<StatusPayload>(document, variables)
            .await
            .and_then(|payload| payload.accepted(fallback));
        if let Err(e) = &result {
            error!("[UserService] {} failed: {e}", document.name);
        }
        result
    }

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns `INVALID_INPUT` without contacting the backend when `dob` is
    /// invalid, otherwise the dispatch error or the backend's rejection
    pub async fn create_user(&self, user: &NewUser) -> RequestResult<StatusPayload> {
        let variables = user.to_variables()?;
        self.acknowledge(&CREATE_USER, variables, "Failed to create user")
            .await
    }

    /// Email a signup OTP
    ///
    /// # Errors
    ///
    /// Returns the dispatch error or the backend's rejection
    pub async fn send_otp_for_signup(&self, email: &str) -> RequestResult<StatusPayload> {
        info!("[UserService] Sending OTP for signup to {email}");
        self.acknowledge(
            &SEND_OTP_FOR_SIGNUP,
            string_variables([("email", email)]),
            "Failed to send OTP",
        )
        .await
    }

    /// Check a signup OTP
    ///
    /// # Errors
    ///
    /// Returns the dispatch error or the backend's rejection
    pub async fn verify_otp_for_signup(
        &self,
        email: &str,
        otp: &str,
    ) -> RequestResult<StatusPayload> {
        self.acknowledge(
            &VERIFY_OTP_FOR_SIGNUP,
            string_variables([("email", email), ("otp", otp)]),
            "Failed to verify OTP",
        )
        .await
    }

    /// Log in and start a session
    ///
    /// On success the returned tokens are persisted and the session becomes
    /// authenticated.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error, the backend's rejection, or `SERVER_ERROR`
    /// when an accepted login carries no usable tokens
    pub async fn login(&self, email: &str, password: &str) -> RequestResult<LoginData> {
        info!("[UserService] Logging in user: {email}");
        let session = self.dispatcher.session();
        session.login_start();

        let variables = string_variables([("email", email), ("password", password)]);
        let result = self
            .call::<LoginPayload>(&LOGIN, variables)
            .await
            .and_then(|payload| {
                if !payload.status.status {
                    return Err(payload.status.rejection("Login failed"));
                }
                payload
                    .data
                    .filter(|data| !data.id_token.is_empty() && !data.refresh_token.is_empty())
                    .ok_or_else(|| ApiError::unexpected_response(LOGIN.root_field))
            });

        match result {
            Ok(data) => {
                let credential = Credential::tokens(&data.id_token, &data.refresh_token)
                    .with_identity(
                        data.user_id.clone(),
                        data.email.clone().or_else(|| Some(email.to_string())),
                    );
                session.login_success(credential).await;
                Ok(data)
            }
            Err(e) => {
                session.login_failure(&e.message);
                Err(e)
            }
        }
    }

    /// Register an account and start a session
    ///
    /// # Errors
    ///
    /// Returns the dispatch error, or `SERVER_ERROR` when the payload carries
    /// no usable tokens
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> RequestResult<RegisterData> {
        info!("[UserService] Registering user: {email}");
        let session = self.dispatcher.session();
        session.login_start();

        let result = self
            .call::<RegisterData>(
                &REGISTER,
                string_variables([("email", email), ("password", password), ("name", name)]),
            )
            .await
            .and_then(|data| {
                if data.id_token.is_empty() || data.refresh_token.is_empty() {
                    Err(ApiError::unexpected_response(REGISTER.root_field))
                } else {
                    Ok(data)
                }
            });

        match result {
            Ok(data) => {
                let credential = Credential::tokens(&data.id_token, &data.refresh_token)
                    .with_identity(
                        Some(data.user.id.clone()),
                        data.user.email.clone().or_else(|| Some(email.to_string())),
                    );
                session.login_success(credential).await;
                Ok(data)
            }
            Err(e) => {
                session.login_failure(&e.message);
                Err(e)
            }
        }
    }

    /// Profile of the logged-in user
    ///
    /// # Errors
    ///
    /// Returns the dispatch error, `TOKEN_EXPIRED` when the session cannot be
    /// recovered, or `SERVER_ERROR` for a malformed payload
    pub async fn get_user_profile(&self) -> RequestResult<UserProfile> {
        self.call(&GET_USER_PROFILE, Variables::new()).await
    }

    /// # Errors
    ///
    /// Returns the dispatch error or the backend's rejection
    pub async fn send_password_reset_email(&self, email: &str) -> RequestResult<StatusPayload> {
        self.acknowledge(
            &SEND_PASSWORD_RESET_EMAIL,
            string_variables([("email", email)]),
            "Failed to send password reset email",
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the dispatch error or the backend's rejection
    pub async fn send_password_reset_phone(
        &self,
        phone_number: &str,
    ) -> RequestResult<StatusPayload> {
        self.acknowledge(
            &SEND_PASSWORD_RESET_PHONE,
            string_variables([("phoneNumber", phone_number)]),
            "Failed to send password reset SMS",
        )
        .await
    }
}

fn string_variables<const N: usize>(pairs: [(&str, &str); N]) -> Variables {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect()
}
