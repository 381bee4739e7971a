use crate::db::EventStore;

#[derive(Clone)]
pub struct AppState {
    pub store: EventStore,
    pub event_ttl_seconds: i64,
}
