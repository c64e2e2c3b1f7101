use crate::ticketing::TicketingService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub tickets: TicketingService,
}

impl AppState {
    pub fn new(tickets: TicketingService) -> Self {
        Self { tickets }
    }
}
