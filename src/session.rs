use crate::{
    error::SceneTraceResult,
    model::SearchMatch,
    search::{MediaUpload, SearchClient, validate_media_url},
};

/// Lifecycle of the single search the user currently cares about.
#[derive(Clone, Debug, Default)]
pub enum SearchRequestState {
    #[default]
    Idle,
    Loading,
    Succeeded(Vec<SearchMatch>),
    Failed(String),
}

/// Ticket returned by [`SearchSession::begin`]; an outcome is only applied
/// while its ticket is still the newest one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTicket(u64);

/// Owns the search state and mutates it only through defined transitions.
///
/// Starting a new search supersedes any prior one: the state moves to
/// `Loading` (clearing previous results or errors) and the request generation
/// is bumped. A response that arrives carrying a stale ticket is discarded
/// instead of overwriting newer state.
pub struct SearchSession {
    client: SearchClient,
    state: SearchRequestState,
    generation: u64,
}

impl SearchSession {
    pub fn new(client: SearchClient) -> Self {
        Self {
            client,
            state: SearchRequestState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> &SearchRequestState {
        &self.state
    }

    /// Transition to `Loading` and hand out the ticket for this request.
    pub fn begin(&mut self) -> RequestTicket {
        self.generation += 1;
        self.state = SearchRequestState::Loading;
        RequestTicket(self.generation)
    }

    /// Apply a request outcome. Returns `false` when the ticket is stale and
    /// the outcome was discarded.
    pub fn finish(
        &mut self,
        ticket: RequestTicket,
        outcome: SceneTraceResult<Vec<SearchMatch>>,
    ) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(
                stale = ticket.0,
                current = self.generation,
                "discarding superseded search outcome"
            );
            return false;
        }
        self.state = match outcome {
            Ok(matches) => SearchRequestState::Succeeded(matches),
            Err(err) => SearchRequestState::Failed(err.to_string()),
        };
        true
    }

    /// Run a URL search through the full state lifecycle. Local validation
    /// failures return early without ever entering `Loading`.
    pub async fn search_by_url(&mut self, url: &str) -> SceneTraceResult<()> {
        let media_url = validate_media_url(url)?;
        let ticket = self.begin();
        let outcome = self.client.search_by_url(media_url.as_str()).await;
        self.finish(ticket, outcome);
        Ok(())
    }

    /// Run a file-upload search through the full state lifecycle. Local
    /// validation failures return early without ever entering `Loading`.
    pub async fn search_by_file(&mut self, upload: MediaUpload) -> SceneTraceResult<()> {
        upload.validate()?;
        let ticket = self.begin();
        let outcome = self.client.search_by_file(upload).await;
        self.finish(ticket, outcome);
        Ok(())
    }
}
