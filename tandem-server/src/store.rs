//! Sled-backed document store shared by every component.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use sled::{Db, Transactional, Tree};
use tracing::warn;

use crate::error::SocialError;
use crate::requests::RequestStore;
use crate::users::UserDirectory;

pub(crate) type TxResult<T> = ConflictableTransactionResult<T, SocialError>;

const USERS_TREE: &str = "users";
const REQUESTS_TREE: &str = "friend_requests";
const PAIRS_TREE: &str = "request_pairs";

/// Handles to the three trees. Cloning is cheap, sled trees are reference counted.
#[derive(Clone)]
pub struct Store {
    db: Db,
    users: Tree,
    requests: Tree,
    pairs: Tree,
}

/// Transactional views over the store's trees, valid for one transaction attempt.
pub(crate) struct Tx<'a> {
    pub users: &'a TransactionalTree,
    pub requests: &'a TransactionalTree,
    pub pairs: &'a TransactionalTree,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SocialError> {
        Self::from_db(sled::open(path)?)
    }

    pub fn temporary() -> Result<Self, SocialError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, SocialError> {
        Ok(Self {
            users: db.open_tree(USERS_TREE)?,
            requests: db.open_tree(REQUESTS_TREE)?,
            pairs: db.open_tree(PAIRS_TREE)?,
            db,
        })
    }

    pub fn directory(&self) -> UserDirectory {
        UserDirectory::new(self.users.clone())
    }

    pub fn requests(&self) -> RequestStore {
        RequestStore::new(self.requests.clone(), self.pairs.clone())
    }

    pub async fn flush(&self) -> Result<(), SocialError> {
        self.db.flush_async().await?;
        Ok(())
    }

    /// Runs `func` atomically across all trees.
    ///
    /// Sled re-runs the closure on conflicts, so it must not have side effects outside the
    /// transaction. I/O failures are retried up to `retries` times before surfacing.
    pub(crate) fn transact<T>(
        &self,
        retries: u32,
        func: impl Fn(&Tx<'_>) -> TxResult<T>,
    ) -> Result<T, SocialError> {
        let mut attempt = 0;
        loop {
            let outcome = (&self.users, &self.requests, &self.pairs).transaction(
                |(users, requests, pairs)| {
                    func(&Tx {
                        users,
                        requests,
                        pairs,
                    })
                },
            );
            match outcome {
                Ok(value) => return Ok(value),
                Err(TransactionError::Abort(err)) => return Err(err),
                Err(TransactionError::Storage(sled::Error::Io(err))) if attempt < retries => {
                    attempt += 1;
                    warn!(attempt, error = %err, "retrying transaction after storage failure");
                }
                Err(TransactionError::Storage(err)) => return Err(err.into()),
            }
        }
    }
}

/// Aborts the surrounding transaction with `err`.
pub(crate) fn abort<T>(err: SocialError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err))
}

pub(crate) fn tx_get<T: DeserializeOwned>(
    tree: &TransactionalTree,
    key: impl AsRef<[u8]>,
) -> TxResult<Option<T>> {
    match tree.get(key.as_ref())? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .or_else(|err| abort(SocialError::from(err))),
        None => Ok(None),
    }
}

pub(crate) fn tx_put<T: Serialize>(
    tree: &TransactionalTree,
    key: impl AsRef<[u8]>,
    value: &T,
) -> TxResult<()> {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(err) => return abort(SocialError::from(err)),
    };
    tree.insert(key.as_ref(), bytes)?;
    Ok(())
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SocialError> {
    Ok(serde_json::from_slice(bytes)?)
}
