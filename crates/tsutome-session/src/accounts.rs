//! In-memory account directory with argon2 password hashes.

use std::collections::HashMap;
use std::sync::OnceLock;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use parking_lot::RwLock;
use rand::Rng;
use tsutome_protocol::{PlayerId, PublicPlayer, Role};

use crate::store::generate_token;
use crate::{PlayerDirectory, SessionError};

struct Account {
    player: PublicPlayer,
    password_hash: String,
}

#[derive(Default)]
struct Accounts {
    by_id: HashMap<PlayerId, Account>,
    by_name: HashMap<String, PlayerId>,
    next_id: u64,
}

/// A [`PlayerDirectory`] that keeps accounts in memory.
///
/// Passwords are stored only as argon2id PHC strings. Usernames are
/// unique and case-sensitive.
pub struct AccountDirectory {
    accounts: RwLock<Accounts>,
    params: Params,
    /// Checked against when the username is unknown, so a miss costs the
    /// same argon2 work as a wrong password.
    decoy_hash: OnceLock<String>,
}

impl AccountDirectory {
    /// An empty directory hashing with argon2's default cost.
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    /// An empty directory hashing new passwords with `params`.
    ///
    /// Verification always uses the parameters embedded in the stored
    /// hash, so changing `params` never locks existing accounts out.
    pub fn with_params(params: Params) -> Self {
        Self {
            accounts: RwLock::new(Accounts { next_id: 1, ..Accounts::default() }),
            params,
            decoy_hash: OnceLock::new(),
        }
    }

    /// Adds an account and returns its public profile.
    ///
    /// New accounts start at level 1 with no experience or coins.
    /// Hashing is CPU-bound; call this during startup or from
    /// `spawn_blocking`, not on a busy request path.
    ///
    /// # Errors
    /// - [`SessionError::UsernameTaken`] if the name is in use
    /// - [`SessionError::Hashing`] if hashing fails
    pub fn register(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<PublicPlayer, SessionError> {
        if self.accounts.read().by_name.contains_key(username) {
            return Err(SessionError::UsernameTaken(username.to_string()));
        }

        let password_hash = self.hash_password(password)?;

        let mut accounts = self.accounts.write();
        // Re-check under the write lock: another thread may have registered
        // the same name while we were hashing.
        if accounts.by_name.contains_key(username) {
            return Err(SessionError::UsernameTaken(username.to_string()));
        }

        let id = PlayerId(accounts.next_id);
        accounts.next_id += 1;

        let player = PublicPlayer {
            id,
            username: username.to_string(),
            display_name: username.to_string(),
            role,
            level: 1,
            exp: 0,
            coins: 0,
        };
        accounts.by_name.insert(username.to_string(), id);
        accounts.by_id.insert(id, Account { player: player.clone(), password_hash });

        tracing::info!(player_id = %id, username, %role, "account registered");
        Ok(player)
    }

    /// Removes an account. Returns `false` if it didn't exist.
    ///
    /// Sessions of the removed player are not touched here; the next
    /// `lookup` returns `None` and the server drops the session then.
    pub fn remove(&self, player_id: PlayerId) -> bool {
        let mut accounts = self.accounts.write();
        match accounts.by_id.remove(&player_id) {
            Some(account) => {
                accounts.by_name.remove(&account.player.username);
                tracing::info!(%player_id, "account removed");
                true
            }
            None => false,
        }
    }

    /// Number of registered accounts.
    pub fn len(&self) -> usize {
        self.accounts.read().by_id.len()
    }

    /// `true` when no account is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn hash_password(&self, password: &str) -> Result<String, SessionError> {
        let salt_bytes: [u8; 16] = rand::rng().random();
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| SessionError::Hashing(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let phc = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| SessionError::Hashing(e.to_string()))?
            .to_string();
        Ok(phc)
    }

    /// Hash of a random password at this directory's cost, built on first use.
    fn decoy_hash(&self) -> Result<String, SessionError> {
        if let Some(hash) = self.decoy_hash.get() {
            return Ok(hash.clone());
        }
        let hash = self.hash_password(&generate_token())?;
        Ok(self.decoy_hash.get_or_init(|| hash).clone())
    }
}

impl Default for AccountDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn verify_password(hash: &str, password: &str) -> Result<bool, SessionError> {
    let parsed = PasswordHash::new(hash).map_err(|e| SessionError::Hashing(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

impl PlayerDirectory for AccountDirectory {
    async fn verify(&self, username: &str, password: &str) -> Result<PublicPlayer, SessionError> {
        let candidate = {
            let accounts = self.accounts.read();
            accounts
                .by_name
                .get(username)
                .and_then(|id| accounts.by_id.get(id))
                .map(|a| (a.player.clone(), a.password_hash.clone()))
        };

        let (player, hash) = match candidate {
            Some((player, hash)) => (Some(player), hash),
            None => (None, self.decoy_hash()?),
        };

        // Argon2 is slow; keep it off the async workers.
        let password = password.to_string();
        let valid = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
            .await
            .map_err(|e| SessionError::Hashing(e.to_string()))??;

        match player {
            Some(player) if valid => Ok(player),
            Some(player) => {
                tracing::debug!(player_id = %player.id, "wrong password");
                Err(SessionError::InvalidCredentials)
            }
            None => {
                tracing::debug!(username, "login for unknown username");
                Err(SessionError::InvalidCredentials)
            }
        }
    }

    async fn lookup(&self, player_id: PlayerId) -> Option<PublicPlayer> {
        self.accounts.read().by_id.get(&player_id).map(|a| a.player.clone())
    }
}
