use async_trait::async_trait;
use relaycast_core::{IceCandidate, RoomId};
use relaycast_peer::gateway::{
    Attachment, FeedId, GatewayError, GatewayRole, HandleId, JoinRequest, MediaGateway, SessionId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateSession,
    Attach,
    CreateRoom(RoomId),
    ListPublishers(RoomId),
    Join(GatewayRole),
    Publish(String),
    Start(String),
    Trickle(String),
}

#[derive(Default)]
struct GatewayState {
    next_id: u64,
    rooms: HashSet<RoomId>,
    publishers: HashMap<RoomId, Vec<FeedId>>,
    joined: HashMap<HandleId, RoomId>,
    calls: Vec<GatewayCall>,
}

/// In-memory gateway that answers the way a video room plugin does:
/// 427 for an existing room, 425 for a handle that already joined.
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway where `room` already has a publisher.
    pub fn with_publisher(room: &RoomId) -> Self {
        let gateway = Self::new();
        {
            let mut state = gateway.state.lock().unwrap();
            state.rooms.insert(room.clone());
            state.publishers.insert(room.clone(), vec![FeedId(7)]);
        }
        gateway
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&GatewayCall) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    fn record(&self, call: GatewayCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl MediaGateway for MockGateway {
    async fn create_session(&self) -> Result<SessionId, GatewayError> {
        self.record(GatewayCall::CreateSession);
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        Ok(SessionId(state.next_id))
    }

    async fn attach(&self, _session: SessionId) -> Result<HandleId, GatewayError> {
        self.record(GatewayCall::Attach);
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        Ok(HandleId(state.next_id))
    }

    async fn create_room(&self, _at: Attachment, room: &RoomId) -> Result<(), GatewayError> {
        self.record(GatewayCall::CreateRoom(room.clone()));
        let mut state = self.state.lock().unwrap();
        if !state.rooms.insert(room.clone()) {
            return Err(GatewayError::from_code(427, "Room exists"));
        }
        Ok(())
    }

    async fn list_publishers(
        &self,
        _at: Attachment,
        room: &RoomId,
    ) -> Result<Vec<FeedId>, GatewayError> {
        self.record(GatewayCall::ListPublishers(room.clone()));
        let state = self.state.lock().unwrap();
        Ok(state.publishers.get(room).cloned().unwrap_or_default())
    }

    async fn join(
        &self,
        at: Attachment,
        request: JoinRequest,
    ) -> Result<Option<String>, GatewayError> {
        self.record(GatewayCall::Join(request.role));
        let mut state = self.state.lock().unwrap();
        if state.joined.contains_key(&at.handle) {
            return Err(GatewayError::from_code(425, "Already in as a participant"));
        }
        if !state.rooms.contains(&request.room) {
            return Err(GatewayError::from_code(426, "No such room"));
        }
        state.joined.insert(at.handle, request.room.clone());
        match request.role {
            GatewayRole::Publisher => {
                let feed = FeedId(at.handle.0);
                state.publishers.entry(request.room).or_default().push(feed);
                Ok(None)
            }
            GatewayRole::Subscriber => Ok(Some("gateway-offer".to_owned())),
        }
    }

    async fn publish(&self, _at: Attachment, offer: String) -> Result<String, GatewayError> {
        self.record(GatewayCall::Publish(offer));
        Ok("gateway-answer".to_owned())
    }

    async fn start(&self, _at: Attachment, answer: String) -> Result<(), GatewayError> {
        self.record(GatewayCall::Start(answer));
        Ok(())
    }

    async fn trickle(&self, _at: Attachment, candidate: IceCandidate) -> Result<(), GatewayError> {
        self.record(GatewayCall::Trickle(candidate.candidate));
        Ok(())
    }
}
