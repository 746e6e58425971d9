use sled::transaction::TransactionalTree;
use sled::Tree;
use tandem_common::{FriendRequest, FriendRequestId, UserId};

use crate::error::SocialError;
use crate::store::{decode, tx_get, tx_put, TxResult};

/// Key of the ordered-pair index: at most one request per (sender, recipient).
pub(crate) fn pair_key(sender: &UserId, recipient: &UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(sender.0.len() + recipient.0.len() + 1);
    key.extend_from_slice(sender.0.as_bytes());
    key.push(0);
    key.extend_from_slice(recipient.0.as_bytes());
    key
}

#[derive(Clone)]
pub struct RequestStore {
    records: Tree,
    pairs: Tree,
}

impl RequestStore {
    pub fn new(records: Tree, pairs: Tree) -> Self {
        Self { records, pairs }
    }

    pub fn get(&self, id: &FriendRequestId) -> Result<Option<FriendRequest>, SocialError> {
        self.records
            .get(id.0.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    /// The request sent from `sender` to `recipient`, if any, in any status.
    pub fn between(
        &self,
        sender: &UserId,
        recipient: &UserId,
    ) -> Result<Option<FriendRequest>, SocialError> {
        match self.pairs.get(pair_key(sender, recipient))? {
            Some(id) => self.get(&FriendRequestId(String::from_utf8_lossy(&id).into_owned())),
            None => Ok(None),
        }
    }

    /// Lazily scans all requests matching `predicate`.
    pub fn find<'a>(
        &self,
        predicate: impl Fn(&FriendRequest) -> bool + 'a,
    ) -> impl Iterator<Item = Result<FriendRequest, SocialError>> + 'a {
        self.records
            .iter()
            .values()
            .map(|bytes| -> Result<FriendRequest, SocialError> { decode(&bytes?) })
            .filter(move |request| match request {
                Ok(request) => predicate(request),
                Err(_) => true,
            })
    }
}

pub(crate) fn get_in(
    records: &TransactionalTree,
    id: &FriendRequestId,
) -> TxResult<Option<FriendRequest>> {
    tx_get(records, id.0.as_bytes())
}

pub(crate) fn between_in(
    tx_records: &TransactionalTree,
    tx_pairs: &TransactionalTree,
    sender: &UserId,
    recipient: &UserId,
) -> TxResult<Option<FriendRequest>> {
    match tx_pairs.get(pair_key(sender, recipient))? {
        Some(id) => get_in(
            tx_records,
            &FriendRequestId(String::from_utf8_lossy(&id).into_owned()),
        ),
        None => Ok(None),
    }
}

/// Writes the record and its pair index entry.
pub(crate) fn put_in(
    tx_records: &TransactionalTree,
    tx_pairs: &TransactionalTree,
    request: &FriendRequest,
) -> TxResult<()> {
    tx_put(tx_records, request.id.0.as_bytes(), request)?;
    tx_pairs.insert(
        pair_key(&request.sender, &request.recipient),
        request.id.0.as_bytes(),
    )?;
    Ok(())
}

pub(crate) fn delete_in(
    tx_records: &TransactionalTree,
    tx_pairs: &TransactionalTree,
    request: &FriendRequest,
) -> TxResult<()> {
    tx_records.remove(request.id.0.as_bytes())?;
    tx_pairs.remove(pair_key(&request.sender, &request.recipient))?;
    Ok(())
}
