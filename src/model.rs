use crate::error::{SceneTraceError, SceneTraceResult};

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct AnilistTitle {
    #[serde(default)]
    pub native: Option<String>,
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnilistInfo {
    pub id: u64,
    #[serde(default)]
    pub id_mal: Option<u64>,
    #[serde(default)]
    pub title: AnilistTitle,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub is_adult: bool,
}

/// The `anilist` field of a match is either the full enrichment record or a
/// bare numeric id when enrichment was not requested. The two shapes are
/// mutually exclusive, so always discriminate through this enum rather than
/// assuming the structured form.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum AnilistRef {
    Info(Box<AnilistInfo>),
    Id(u64),
}

impl AnilistRef {
    pub fn id(&self) -> u64 {
        match self {
            Self::Info(info) => info.id,
            Self::Id(id) => *id,
        }
    }

    pub fn info(&self) -> Option<&AnilistInfo> {
        match self {
            Self::Info(info) => Some(info),
            Self::Id(_) => None,
        }
    }

    pub fn url(&self) -> String {
        format!("https://anilist.co/anime/{}", self.id())
    }
}

/// Episode labels come back as a number, a free-form string, or null.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Episode {
    Number(f64),
    Label(String),
}

impl std::fmt::Display for Episode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // trace.moe emits fractional specials like 12.5; whole numbers
            // print without the trailing ".0".
            Self::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Label(s) => write!(f, "{s}"),
        }
    }
}

/// A single normalized scene match from the search API.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SearchMatch {
    pub anilist: AnilistRef,
    pub filename: String,
    #[serde(default)]
    pub episode: Option<Episode>,
    pub from: f64,
    pub to: f64,
    pub similarity: f64,
    pub video: String,
    pub image: String,
}

impl SearchMatch {
    /// Preferred display title: romaji, then english, then native, then the
    /// bare Anilist id.
    pub fn display_title(&self) -> String {
        if let Some(info) = self.anilist.info() {
            let title = &info.title;
            if let Some(t) = title
                .romaji
                .as_deref()
                .or(title.english.as_deref())
                .or(title.native.as_deref())
            {
                return t.to_string();
            }
        }
        format!("Anilist ID: {}", self.anilist.id())
    }

    pub fn is_adult(&self) -> bool {
        self.anilist.info().is_some_and(|info| info.is_adult)
    }

    pub fn similarity_percent(&self) -> f64 {
        self.similarity * 100.0
    }

    pub fn validate(&self) -> SceneTraceResult<()> {
        if !self.similarity.is_finite() || !(0.0..=1.0).contains(&self.similarity) {
            return Err(SceneTraceError::request(format!(
                "match '{}' has similarity outside [0, 1]",
                self.filename
            )));
        }
        if self.to < self.from {
            return Err(SceneTraceError::request(format!(
                "match '{}' has a clip interval ending before it starts",
                self.filename
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub frame_count: u64,
    #[serde(default)]
    pub result: Vec<SearchMatch>,
}

/// Stable descending sort by similarity; ties keep their original relative
/// order, so sorting an already-sorted list is a no-op.
pub fn sort_by_confidence(matches: &mut [SearchMatch]) {
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
}

pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
