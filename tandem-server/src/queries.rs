use tandem_common::responses::FriendRequestsResponse;
use tandem_common::{FriendRequest, FriendRequestView, RequestStatus, UserSummary};
use tracing::{debug, warn};

use crate::config::AcceptedDirection;
use crate::error::SocialError;
use crate::requests::RequestStore;
use crate::users::UserDirectory;
use crate::Viewer;

/// Read-only projections for the presentation layer.
#[derive(Clone)]
pub struct QueryFacade {
    directory: UserDirectory,
    requests: RequestStore,
    accepted_direction: AcceptedDirection,
}

impl QueryFacade {
    pub fn new(
        directory: UserDirectory,
        requests: RequestStore,
        accepted_direction: AcceptedDirection,
    ) -> Self {
        Self {
            directory,
            requests,
            accepted_direction,
        }
    }

    pub fn my_friends(&self, viewer: &Viewer) -> Result<Vec<UserSummary>, SocialError> {
        let me = self.directory.require(viewer.id())?;
        let mut friends = Vec::with_capacity(me.friends().len());
        for id in me.friends() {
            match self.directory.summary(id)? {
                Some(friend) => friends.push(friend),
                None => warn!(user = %me.id, friend = %id, "friend document missing"),
            }
        }
        Ok(friends)
    }

    pub fn friend_requests(&self, viewer: &Viewer) -> Result<FriendRequestsResponse, SocialError> {
        let me = self.directory.require(viewer.id())?;
        let direction = self.accepted_direction;
        let incoming_reqs = self.views(|r| r.status == RequestStatus::Pending && r.recipient == me.id)?;
        let accepted_reqs = self.views(|r| direction.matches(r, &me.id))?;
        debug!(
            user = %me.id,
            incoming = incoming_reqs.len(),
            accepted = accepted_reqs.len(),
            "loaded friend requests"
        );
        Ok(FriendRequestsResponse {
            incoming_reqs,
            accepted_reqs,
        })
    }

    pub fn outgoing_friend_requests(
        &self,
        viewer: &Viewer,
    ) -> Result<Vec<FriendRequestView>, SocialError> {
        let me = self.directory.require(viewer.id())?;
        self.views(|r| r.status == RequestStatus::Pending && r.sender == me.id)
    }

    fn views(
        &self,
        predicate: impl Fn(&FriendRequest) -> bool,
    ) -> Result<Vec<FriendRequestView>, SocialError> {
        let mut views = Vec::new();
        for request in self.requests.find(predicate) {
            if let Some(view) = self.join(request?)? {
                views.push(view);
            }
        }
        views.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(views)
    }

    fn join(&self, request: FriendRequest) -> Result<Option<FriendRequestView>, SocialError> {
        let sender = self.directory.summary(&request.sender)?;
        let recipient = self.directory.summary(&request.recipient)?;
        let (Some(sender), Some(recipient)) = (sender, recipient) else {
            warn!(request = %request.id, "skipping friend request with missing user");
            return Ok(None);
        };
        Ok(Some(FriendRequestView {
            id: request.id,
            status: request.status,
            sender,
            recipient,
            created_at: request.created_at,
        }))
    }
}
