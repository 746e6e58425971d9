//! Friend request state machine.
//!
//! A request is created `pending` and either becomes `accepted` (kept as a notification record)
//! or is deleted by a reject. The friends relation is stored on both user documents and every
//! operation that touches it updates both sides in the same transaction as the request.

use chrono::Utc;
use tandem_common::responses::SendFriendRequestResponse;
use tandem_common::{FriendRequest, FriendRequestId, RequestStatus, UserId};
use tracing::info;

use crate::config::{ReciprocalPolicy, SocialPolicy};
use crate::error::SocialError;
use crate::requests;
use crate::store::{abort, tx_get, Store, Tx, TxResult};
use crate::users::{self, UserData};
use crate::Viewer;

#[derive(Clone)]
pub struct RelationshipEngine {
    store: Store,
    policy: SocialPolicy,
}

impl RelationshipEngine {
    pub fn new(store: Store, policy: SocialPolicy) -> Self {
        Self { store, policy }
    }

    pub fn send_friend_request(
        &self,
        viewer: &Viewer,
        target: &UserId,
    ) -> Result<SendFriendRequestResponse, SocialError> {
        let me = viewer.id();
        if me == target {
            return Err(SocialError::InvalidTarget);
        }
        let id = FriendRequestId(uuid::Uuid::new_v4().to_string());
        let response = self.store.transact(self.policy.max_tx_retries, |tx| {
            let mut sender = users::require_in(tx.users, me)?;
            let mut recipient = users::require_in(tx.users, target)?;
            if sender.is_friend(target) || recipient.is_friend(me) {
                return abort(SocialError::AlreadyFriends(target.clone()));
            }
            if requests::between_in(tx.requests, tx.pairs, me, target)?.is_some() {
                return abort(SocialError::DuplicateRequest(target.clone()));
            }
            if let Some(reverse) = requests::between_in(tx.requests, tx.pairs, target, me)? {
                return match (self.policy.reciprocal, reverse.status) {
                    (ReciprocalPolicy::AutoAccept, RequestStatus::Pending) => {
                        // `sender` here is the recipient of the reverse request.
                        let accepted = accept_in(tx, reverse, &mut recipient, &mut sender)?;
                        Ok(SendFriendRequestResponse {
                            id: accepted.id,
                            status: accepted.status,
                        })
                    }
                    _ => abort(SocialError::DuplicateRequest(target.clone())),
                };
            }
            let now = Utc::now();
            let request = FriendRequest {
                id: id.clone(),
                sender: me.clone(),
                recipient: target.clone(),
                status: RequestStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            requests::put_in(tx.requests, tx.pairs, &request)?;
            Ok(SendFriendRequestResponse {
                id: request.id,
                status: request.status,
            })
        })?;
        info!(
            sender = %me,
            recipient = %target,
            request = %response.id,
            status = ?response.status,
            "friend request sent"
        );
        Ok(response)
    }

    pub fn accept_friend_request(
        &self,
        viewer: &Viewer,
        request_id: &FriendRequestId,
    ) -> Result<FriendRequest, SocialError> {
        let accepted = self.store.transact(self.policy.max_tx_retries, |tx| {
            let request = answerable_in(tx, viewer, request_id)?;
            let mut sender = users::require_in(tx.users, &request.sender)?;
            let mut recipient = users::require_in(tx.users, &request.recipient)?;
            accept_in(tx, request, &mut sender, &mut recipient)
        })?;
        info!(
            sender = %accepted.sender,
            recipient = %accepted.recipient,
            request = %accepted.id,
            "friend request accepted"
        );
        Ok(accepted)
    }

    pub fn reject_friend_request(
        &self,
        viewer: &Viewer,
        request_id: &FriendRequestId,
    ) -> Result<(), SocialError> {
        let rejected = self.store.transact(self.policy.max_tx_retries, |tx| {
            let request = answerable_in(tx, viewer, request_id)?;
            requests::delete_in(tx.requests, tx.pairs, &request)?;
            Ok(request)
        })?;
        info!(
            sender = %rejected.sender,
            recipient = %rejected.recipient,
            request = %rejected.id,
            "friend request rejected"
        );
        Ok(())
    }

    /// Removes the friendship on both sides. Accepted request records are left in place.
    pub fn remove_friend(&self, viewer: &Viewer, other: &UserId) -> Result<(), SocialError> {
        let me = viewer.id();
        self.store.transact(self.policy.max_tx_retries, |tx| {
            let mut user = users::require_in(tx.users, me)?;
            if !user.unlink(other) {
                return abort(SocialError::NotAFriend(other.clone()));
            }
            users::put_in(tx.users, &user)?;
            // A dangling id on our side is still removed even if the other document is gone.
            if let Some(mut friend) = tx_get::<UserData>(tx.users, other.0.as_bytes())? {
                friend.unlink(me);
                users::put_in(tx.users, &friend)?;
            }
            Ok(())
        })?;
        info!(user = %me, friend = %other, "friend removed");
        Ok(())
    }
}

/// Loads a request the viewer may accept or reject.
fn answerable_in(tx: &Tx<'_>, viewer: &Viewer, id: &FriendRequestId) -> TxResult<FriendRequest> {
    let Some(request) = requests::get_in(tx.requests, id)? else {
        return abort(SocialError::RequestNotFound(id.clone()));
    };
    if &request.recipient != viewer.id() {
        return abort(SocialError::Forbidden {
            viewer: viewer.id().clone(),
            request: id.clone(),
        });
    }
    if request.status != RequestStatus::Pending {
        return abort(SocialError::InvalidState {
            request: id.clone(),
            status: request.status,
        });
    }
    Ok(request)
}

fn accept_in(
    tx: &Tx<'_>,
    mut request: FriendRequest,
    sender: &mut UserData,
    recipient: &mut UserData,
) -> TxResult<FriendRequest> {
    request.status = RequestStatus::Accepted;
    request.updated_at = Utc::now();
    sender.link(&recipient.id);
    recipient.link(&sender.id);
    requests::put_in(tx.requests, tx.pairs, &request)?;
    users::put_in(tx.users, sender)?;
    users::put_in(tx.users, recipient)?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use tandem_common::Profile;

    use crate::users::UserDirectory;

    struct Fixture {
        store: Store,
        engine: RelationshipEngine,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_policy(SocialPolicy::default())
        }

        fn with_policy(policy: SocialPolicy) -> Self {
            let store = Store::temporary().unwrap();
            let engine = RelationshipEngine::new(store.clone(), policy);
            Self { store, engine }
        }

        fn directory(&self) -> UserDirectory {
            self.store.directory()
        }

        fn user(&self, name: &str) -> Viewer {
            let profile = Profile {
                full_name: name.to_string(),
                ..Profile::default()
            };
            Viewer::new(self.directory().create_account(profile).unwrap().id)
        }

        fn friends_of(&self, viewer: &Viewer) -> Vec<UserId> {
            self.directory()
                .require(viewer.id())
                .unwrap()
                .friends()
                .iter()
                .cloned()
                .collect()
        }
    }

    #[test]
    fn send_creates_pending_request() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        let sent = f.engine.send_friend_request(&a, b.id()).unwrap();
        assert_eq!(sent.status, RequestStatus::Pending);

        let stored = f.store.requests().get(&sent.id).unwrap().unwrap();
        assert_eq!(&stored.sender, a.id());
        assert_eq!(&stored.recipient, b.id());
        assert!(f.friends_of(&a).is_empty());
    }

    #[test]
    fn cannot_request_self() {
        let f = Fixture::new();
        let a = f.user("a");
        let err = f.engine.send_friend_request(&a, a.id()).unwrap_err();
        assert!(matches!(err, SocialError::InvalidTarget));
    }

    #[test]
    fn unknown_target_is_not_found() {
        let f = Fixture::new();
        let a = f.user("a");
        let err = f
            .engine
            .send_friend_request(&a, &UserId("nobody".into()))
            .unwrap_err();
        assert!(matches!(err, SocialError::UserNotFound(id) if id.0 == "nobody"));
    }

    #[test]
    fn second_send_is_duplicate() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        f.engine.send_friend_request(&a, b.id()).unwrap();
        let err = f.engine.send_friend_request(&a, b.id()).unwrap_err();
        assert!(matches!(err, SocialError::DuplicateRequest(_)));
    }

    #[test]
    fn reciprocal_send_is_duplicate_under_reject_policy() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        f.engine.send_friend_request(&a, b.id()).unwrap();
        let err = f.engine.send_friend_request(&b, a.id()).unwrap_err();
        assert!(matches!(err, SocialError::DuplicateRequest(_)));
        assert!(f.friends_of(&a).is_empty());
    }

    #[test]
    fn reciprocal_send_accepts_under_auto_accept_policy() {
        let f = Fixture::with_policy(SocialPolicy {
            reciprocal: ReciprocalPolicy::AutoAccept,
            ..SocialPolicy::default()
        });
        let (a, b) = (f.user("a"), f.user("b"));
        let first = f.engine.send_friend_request(&a, b.id()).unwrap();
        let second = f.engine.send_friend_request(&b, a.id()).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.status, RequestStatus::Accepted);
        assert_eq!(f.friends_of(&a), vec![b.id().clone()]);
        assert_eq!(f.friends_of(&b), vec![a.id().clone()]);
        // no second record for the reverse direction
        assert!(f.store.requests().between(b.id(), a.id()).unwrap().is_none());
    }

    #[test]
    fn accept_links_both_users() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        let sent = f.engine.send_friend_request(&a, b.id()).unwrap();
        let accepted = f.engine.accept_friend_request(&b, &sent.id).unwrap();

        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert_eq!(f.friends_of(&a), vec![b.id().clone()]);
        assert_eq!(f.friends_of(&b), vec![a.id().clone()]);
        assert!(!f.friends_of(&a).contains(a.id()));
    }

    #[test]
    fn second_accept_is_invalid_state() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        let sent = f.engine.send_friend_request(&a, b.id()).unwrap();
        f.engine.accept_friend_request(&b, &sent.id).unwrap();
        let err = f.engine.accept_friend_request(&b, &sent.id).unwrap_err();
        assert!(matches!(
            err,
            SocialError::InvalidState {
                status: RequestStatus::Accepted,
                ..
            }
        ));
    }

    #[test]
    fn only_recipient_may_answer() {
        let f = Fixture::new();
        let (a, b, c) = (f.user("a"), f.user("b"), f.user("c"));
        let sent = f.engine.send_friend_request(&a, b.id()).unwrap();

        let err = f.engine.accept_friend_request(&a, &sent.id).unwrap_err();
        assert!(matches!(err, SocialError::Forbidden { .. }));
        let err = f.engine.reject_friend_request(&c, &sent.id).unwrap_err();
        assert!(matches!(err, SocialError::Forbidden { .. }));
        assert!(f.store.requests().get(&sent.id).unwrap().is_some());
    }

    #[test]
    fn unknown_request_is_not_found() {
        let f = Fixture::new();
        let a = f.user("a");
        let missing = FriendRequestId("missing".into());
        assert!(matches!(
            f.engine.accept_friend_request(&a, &missing).unwrap_err(),
            SocialError::RequestNotFound(_)
        ));
        assert!(matches!(
            f.engine.reject_friend_request(&a, &missing).unwrap_err(),
            SocialError::RequestNotFound(_)
        ));
    }

    #[test]
    fn reject_deletes_request() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        let sent = f.engine.send_friend_request(&a, b.id()).unwrap();
        f.engine.reject_friend_request(&b, &sent.id).unwrap();

        assert!(f.store.requests().get(&sent.id).unwrap().is_none());
        assert!(f.store.requests().between(a.id(), b.id()).unwrap().is_none());
        let err = f.engine.accept_friend_request(&b, &sent.id).unwrap_err();
        assert!(matches!(err, SocialError::RequestNotFound(_)));

        // the pair is free again
        let again = f.engine.send_friend_request(&a, b.id()).unwrap();
        assert_ne!(again.id, sent.id);
        assert_eq!(again.status, RequestStatus::Pending);
    }

    #[test]
    fn rejecting_accepted_request_is_invalid_state() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        let sent = f.engine.send_friend_request(&a, b.id()).unwrap();
        f.engine.accept_friend_request(&b, &sent.id).unwrap();
        let err = f.engine.reject_friend_request(&b, &sent.id).unwrap_err();
        assert!(matches!(err, SocialError::InvalidState { .. }));
        assert_eq!(f.friends_of(&b), vec![a.id().clone()]);
    }

    #[test]
    fn sending_to_friend_is_already_friends() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        let sent = f.engine.send_friend_request(&a, b.id()).unwrap();
        f.engine.accept_friend_request(&b, &sent.id).unwrap();

        assert!(matches!(
            f.engine.send_friend_request(&a, b.id()).unwrap_err(),
            SocialError::AlreadyFriends(_)
        ));
        assert!(matches!(
            f.engine.send_friend_request(&b, a.id()).unwrap_err(),
            SocialError::AlreadyFriends(_)
        ));
    }

    #[test]
    fn remove_friend_is_symmetric_and_not_idempotent() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        let sent = f.engine.send_friend_request(&a, b.id()).unwrap();
        f.engine.accept_friend_request(&b, &sent.id).unwrap();

        f.engine.remove_friend(&a, b.id()).unwrap();
        assert!(f.friends_of(&a).is_empty());
        assert!(f.friends_of(&b).is_empty());

        let err = f.engine.remove_friend(&a, b.id()).unwrap_err();
        assert!(matches!(err, SocialError::NotAFriend(_)));
        let err = f.engine.remove_friend(&b, a.id()).unwrap_err();
        assert!(matches!(err, SocialError::NotAFriend(_)));
    }

    #[test]
    fn remove_friend_keeps_accepted_record() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        let sent = f.engine.send_friend_request(&a, b.id()).unwrap();
        f.engine.accept_friend_request(&b, &sent.id).unwrap();
        f.engine.remove_friend(&b, a.id()).unwrap();

        let record = f.store.requests().get(&sent.id).unwrap().unwrap();
        assert_eq!(record.status, RequestStatus::Accepted);
        let err = f.engine.send_friend_request(&a, b.id()).unwrap_err();
        assert!(matches!(err, SocialError::DuplicateRequest(_)));
    }

    #[test]
    fn removing_a_stranger_is_not_a_friend() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        assert!(matches!(
            f.engine.remove_friend(&a, b.id()).unwrap_err(),
            SocialError::NotAFriend(_)
        ));
        assert!(matches!(
            f.engine.remove_friend(&a, a.id()).unwrap_err(),
            SocialError::NotAFriend(_)
        ));
    }

    #[test]
    fn concurrent_reciprocal_sends_create_one_request() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        let engine = Arc::new(f.engine.clone());

        let handles: Vec<_> = [(a.clone(), b.clone()), (b.clone(), a.clone())]
            .into_iter()
            .cycle()
            .take(8)
            .map(|(from, to)| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.send_friend_request(&from, to.id()))
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|err| matches!(err, SocialError::DuplicateRequest(_))));
        let stored = f
            .store
            .requests()
            .find(|r| r.involves(a.id()))
            .count();
        assert_eq!(stored, 1);
    }

    #[test]
    fn concurrent_accept_and_remove_stay_symmetric() {
        let f = Fixture::new();
        let (a, b) = (f.user("a"), f.user("b"));
        let sent = f.engine.send_friend_request(&a, b.id()).unwrap();

        let accept = {
            let engine = f.engine.clone();
            let (b, id) = (b.clone(), sent.id.clone());
            std::thread::spawn(move || engine.accept_friend_request(&b, &id).map(|_| ()))
        };
        let remove = {
            let engine = f.engine.clone();
            let (a, b) = (a.clone(), b.clone());
            std::thread::spawn(move || engine.remove_friend(&a, b.id()))
        };
        accept.join().unwrap().unwrap();
        let _ = remove.join().unwrap();

        let a_has_b = f.friends_of(&a).contains(b.id());
        let b_has_a = f.friends_of(&b).contains(a.id());
        assert_eq!(a_has_b, b_has_a);
    }
}
