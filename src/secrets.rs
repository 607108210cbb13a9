// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Secret generation for fresh installations.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use rand::{distributions::Alphanumeric, Rng};
use std::fmt::{Debug, Formatter, Result as FmtResult};

const SIGNING_KEY_LEN: usize = 64;
const DATABASE_PASSWORD_LEN: usize = 32;
const ENCRYPTION_KEY_BYTES: usize = 32;

/// Credentials generated once per installation.
#[derive(Clone, PartialEq, Eq)]
pub struct Secrets {
    /// Key the application signs sessions and tokens with.
    pub signing_key: String,

    /// URL-safe base64 key for encrypted model fields.
    pub encryption_key: String,

    /// Database user name.
    pub database_user: String,

    /// Database password.
    pub database_password: String,
}

impl Secrets {
    /// Generate fresh secrets for given database user.
    pub fn generate(database_user: impl Into<String>) -> Self {
        let mut rng = rand::thread_rng();
        let key: [u8; ENCRYPTION_KEY_BYTES] = rng.gen();

        Self {
            signing_key: alphanumeric(&mut rng, SIGNING_KEY_LEN),
            encryption_key: URL_SAFE.encode(key),
            database_user: database_user.into(),
            database_password: alphanumeric(&mut rng, DATABASE_PASSWORD_LEN),
        }
    }
}

impl Debug for Secrets {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.debug_struct("Secrets")
            .field("signing_key", &"<redacted>")
            .field("encryption_key", &"<redacted>")
            .field("database_user", &self.database_user)
            .field("database_password", &"<redacted>")
            .finish()
    }
}

fn alphanumeric(rng: &mut impl Rng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
