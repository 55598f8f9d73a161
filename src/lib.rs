#![forbid(unsafe_code)]

pub mod error;
pub mod fetch;
pub mod meme;
pub mod model;
pub mod rank;
pub mod search;
pub mod session;

pub use error::{SceneTraceError, SceneTraceResult};
pub use fetch::ImageFetcher;
pub use meme::{MEME_FILE_NAME, MemeComposition, RenderOptions};
pub use model::{
    AnilistInfo, AnilistRef, Episode, SearchMatch, SearchResponse, format_timestamp,
    sort_by_confidence,
};
pub use rank::{HIGH_CONFIDENCE_THRESHOLD, RankedMatches, partition_by_confidence};
pub use search::{MAX_UPLOAD_BYTES, MediaUpload, SearchClient, resolve_body};
pub use session::{RequestTicket, SearchRequestState, SearchSession};
