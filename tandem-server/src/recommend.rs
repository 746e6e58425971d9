use std::collections::BTreeSet;

use tandem_common::{UserId, UserSummary};
use tracing::debug;

use crate::error::SocialError;
use crate::users::{UserData, UserDirectory};
use crate::Viewer;

#[derive(Clone)]
pub struct RecommendationEngine {
    directory: UserDirectory,
}

impl RecommendationEngine {
    pub fn new(directory: UserDirectory) -> Self {
        Self { directory }
    }

    /// Candidate partners for `viewer`: onboarded users that are neither the viewer nor a friend.
    ///
    /// The viewer's friends are captured when this is called; the user scan itself runs on
    /// every [`Recommendations::iter`].
    pub fn recommended_users(&self, viewer: &Viewer) -> Result<Recommendations, SocialError> {
        let me = self.directory.require(viewer.id())?;
        debug!(user = %me.id, friends = me.friends().len(), "computing recommendations");
        Ok(Recommendations {
            directory: self.directory.clone(),
            excluded: me.friends().clone(),
            viewer: me.id,
        })
    }
}

pub struct Recommendations {
    directory: UserDirectory,
    viewer: UserId,
    excluded: BTreeSet<UserId>,
}

impl Recommendations {
    fn eligible(&self, candidate: &UserData) -> bool {
        candidate.is_onboarded && candidate.id != self.viewer && !self.excluded.contains(&candidate.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<UserSummary, SocialError>> + '_ {
        self.directory.iter().filter_map(move |candidate| match candidate {
            Ok(candidate) if self.eligible(&candidate) => Some(Ok(candidate.summary())),
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })
    }

    pub fn collect(&self) -> Result<Vec<UserSummary>, SocialError> {
        self.iter().collect()
    }
}
