use std::time::Instant;

use crate::pipeline::QueryPipeline;
use crate::session::SessionStore;
use crate::tickets::TicketStore;

pub struct AppState {
    pub pipeline: QueryPipeline,
    pub sessions: SessionStore,
    pub tickets: TicketStore,
    pub start_time: Instant,
}
