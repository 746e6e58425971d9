use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sled::transaction::TransactionalTree;
use sled::Tree;
use tandem_common::{Profile, UserId, UserSummary};
use tracing::info;

use crate::error::SocialError;
use crate::store::{abort, decode, tx_get, tx_put, TxResult};
use crate::Viewer;

/// Stored user document.
///
/// The friends set is only reachable through [`UserData::link`] and [`UserData::unlink`], which
/// the relationship engine calls on both sides inside one transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserData {
    pub id: UserId,
    pub profile: Profile,
    pub is_onboarded: bool,
    friends: BTreeSet<UserId>,
}

impl UserData {
    pub fn new(id: UserId, profile: Profile) -> Self {
        Self {
            id,
            profile,
            is_onboarded: false,
            friends: BTreeSet::new(),
        }
    }

    pub fn friends(&self) -> &BTreeSet<UserId> {
        &self.friends
    }

    pub fn is_friend(&self, other: &UserId) -> bool {
        self.friends.contains(other)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            profile: self.profile.clone(),
            is_onboarded: self.is_onboarded,
        }
    }

    /// Adds `other` to the friends set. Never links a user to itself.
    pub(crate) fn link(&mut self, other: &UserId) -> bool {
        other != &self.id && self.friends.insert(other.clone())
    }

    pub(crate) fn unlink(&mut self, other: &UserId) -> bool {
        self.friends.remove(other)
    }
}

/// Fields a profile must carry before the user is eligible for recommendations.
pub fn missing_onboarding_fields(profile: &Profile) -> Vec<&'static str> {
    [
        ("fullName", &profile.full_name),
        ("bio", &profile.bio),
        ("nativeLanguage", &profile.native_language),
        ("learningLanguage", &profile.learning_language),
        ("location", &profile.location),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect()
}

#[derive(Clone)]
pub struct UserDirectory {
    tree: Tree,
}

impl UserDirectory {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    pub fn get(&self, id: &UserId) -> Result<Option<UserData>, SocialError> {
        self.tree
            .get(id.0.as_bytes())?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn require(&self, id: &UserId) -> Result<UserData, SocialError> {
        self.get(id)?
            .ok_or_else(|| SocialError::UserNotFound(id.clone()))
    }

    pub fn summary(&self, id: &UserId) -> Result<Option<UserSummary>, SocialError> {
        Ok(self.get(id)?.map(|user| user.summary()))
    }

    /// Lazily scans every user document.
    pub fn iter(&self) -> impl Iterator<Item = Result<UserData, SocialError>> {
        self.tree
            .iter()
            .values()
            .map(|bytes| -> Result<UserData, SocialError> { decode(&bytes?) })
    }

    /// Creates a fresh, not yet onboarded account.
    pub fn create_account(&self, profile: Profile) -> Result<UserSummary, SocialError> {
        let user = UserData::new(UserId(uuid::Uuid::new_v4().to_string()), profile);
        self.tree
            .insert(user.id.0.as_bytes(), serde_json::to_vec(&user)?)?;
        info!(user = %user.id, "account created");
        Ok(user.summary())
    }

    /// Replaces the viewer's profile and marks them onboarded. The flag is never cleared.
    pub fn complete_onboarding(
        &self,
        viewer: &Viewer,
        profile: Profile,
    ) -> Result<UserSummary, SocialError> {
        let missing = missing_onboarding_fields(&profile);
        if !missing.is_empty() {
            return Err(SocialError::InvalidProfile(missing));
        }
        let outcome = self.tree.transaction(|tx| {
            let mut user = require_in(tx, viewer.id())?;
            user.profile = profile.clone();
            user.is_onboarded = true;
            put_in(tx, &user)?;
            Ok(user.summary())
        });
        let summary = outcome.map_err(|err| match err {
            sled::transaction::TransactionError::Abort(err) => err,
            sled::transaction::TransactionError::Storage(err) => err.into(),
        })?;
        info!(user = %summary.id, "onboarding completed");
        Ok(summary)
    }
}

pub(crate) fn require_in(tx: &TransactionalTree, id: &UserId) -> TxResult<UserData> {
    match tx_get(tx, id.0.as_bytes())? {
        Some(user) => Ok(user),
        None => abort(SocialError::UserNotFound(id.clone())),
    }
}

pub(crate) fn put_in(tx: &TransactionalTree, user: &UserData) -> TxResult<()> {
    tx_put(tx, user.id.0.as_bytes(), user)
}
