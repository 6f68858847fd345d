use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{debug, info, instrument, warn};

use edu_core::model::{Account, AccountId, Role};
use storage::repository::{AccountRepository, NewAccountRecord, StorageError};

use crate::error::IdentityError;

/// Signup, login and the single active session.
///
/// Credentials are stored as argon2 PHC strings and never leave this service.
#[derive(Clone)]
pub struct IdentityService {
    accounts: Arc<dyn AccountRepository>,
}

impl IdentityService {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    /// Register an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Account` or `IdentityError::EmptyPassword` for
    /// invalid input, `IdentityError::EmailTaken` if the email is registered,
    /// and `IdentityError::Storage` if persistence fails.
    #[instrument(skip(self, password))]
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<Account, IdentityError> {
        // Validate the shape up front; the repository assigns the real id.
        Account::new(AccountId::new(0), email, name, role)?;
        if password.is_empty() {
            return Err(IdentityError::EmptyPassword);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| IdentityError::Hash(e.to_string()))?
            .to_string();

        let id = self
            .accounts
            .insert_new_account(NewAccountRecord {
                email: email.to_owned(),
                name: name.to_owned(),
                role,
                password_hash,
            })
            .await?;
        let account = self.load(id).await?;
        self.accounts.set_active_session(Some(id)).await?;

        info!(account_id = %id, "account registered");
        Ok(account)
    }

    /// Verify credentials and sign the account in.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` for an unknown email or a
    /// wrong password, and `IdentityError::Storage` if persistence fails.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Account, IdentityError> {
        let Some(record) = self.accounts.find_account_by_email(email).await? else {
            debug!("login for unknown email");
            return Err(IdentityError::InvalidCredentials);
        };

        let parsed = PasswordHash::new(&record.password_hash)
            .map_err(|e| IdentityError::Hash(e.to_string()))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            warn!(account_id = %record.account.id(), "password mismatch");
            return Err(IdentityError::InvalidCredentials);
        }

        self.accounts
            .set_active_session(Some(record.account.id()))
            .await?;
        info!(account_id = %record.account.id(), "signed in");
        Ok(record.account)
    }

    /// Clear the active session. Succeeds when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Storage` if persistence fails.
    pub async fn logout(&self) -> Result<(), IdentityError> {
        self.accounts.set_active_session(None).await?;
        info!("signed out");
        Ok(())
    }

    /// The signed-in account, if any.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Storage` if repository access fails.
    pub async fn current_user(&self) -> Result<Option<Account>, IdentityError> {
        match self.accounts.active_session().await? {
            Some(id) => Ok(self.accounts.get_account(id).await?),
            None => Ok(None),
        }
    }

    /// The signed-in account, provided it has `role`.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthenticated` without a session and
    /// `IdentityError::WrongRole` when the account has another role.
    pub async fn require_role(&self, role: Role) -> Result<Account, IdentityError> {
        let account = self
            .current_user()
            .await?
            .ok_or(IdentityError::Unauthenticated)?;
        if !account.has_role(role) {
            warn!(account_id = %account.id(), required = %role, "role check failed");
            return Err(IdentityError::WrongRole { required: role });
        }
        Ok(account)
    }

    async fn load(&self, id: AccountId) -> Result<Account, IdentityError> {
        self.accounts
            .get_account(id)
            .await?
            .ok_or(IdentityError::Storage(StorageError::NotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edu_core::ErrorKind;
    use storage::repository::InMemoryRepository;

    fn service() -> IdentityService {
        IdentityService::new(Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn signup_signs_in_and_login_round_trips() {
        let identity = service();
        let account = identity
            .signup("Ada@Example.com", "hunter2", "Ada", Role::Educator)
            .await
            .unwrap();
        assert_eq!(account.email(), "ada@example.com");
        assert_eq!(identity.current_user().await.unwrap(), Some(account.clone()));

        identity.logout().await.unwrap();
        assert_eq!(identity.current_user().await.unwrap(), None);

        let again = identity.login("ada@example.com ", "hunter2").await.unwrap();
        assert_eq!(again, account);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let identity = service();
        identity
            .signup("sam@example.com", "pw", "Sam", Role::Student)
            .await
            .unwrap();
        let err = identity
            .signup("SAM@example.com", "other", "Sam Two", Role::Student)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let identity = service();
        identity
            .signup("sam@example.com", "pw", "Sam", Role::Student)
            .await
            .unwrap();
        identity.logout().await.unwrap();

        let wrong_pw = identity.login("sam@example.com", "nope").await.unwrap_err();
        let unknown = identity.login("who@example.com", "pw").await.unwrap_err();
        assert_eq!(wrong_pw.kind(), ErrorKind::InvalidCredentials);
        assert_eq!(unknown.to_string(), wrong_pw.to_string());
        assert_eq!(identity.current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let identity = service();
        let empty_pw = identity
            .signup("a@b.c", "", "A", Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(empty_pw, IdentityError::EmptyPassword));

        let bad_email = identity
            .signup("not-an-email", "pw", "A", Role::Student)
            .await
            .unwrap_err();
        assert_eq!(bad_email.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn require_role_checks_session_and_role() {
        let identity = service();
        assert!(matches!(
            identity.require_role(Role::Student).await,
            Err(IdentityError::Unauthenticated)
        ));

        identity
            .signup("sam@example.com", "pw", "Sam", Role::Student)
            .await
            .unwrap();
        assert!(identity.require_role(Role::Student).await.is_ok());
        let err = identity.require_role(Role::Educator).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
