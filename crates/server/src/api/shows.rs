//! Show registration passthrough for the in-process library.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use telesnatch_core::{
    CombinedQuality, Episode, EpisodeKey, EpisodeState, EpisodeStatus, Quality, Show, ShowId,
};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterShowRequest {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub anime: bool,
    #[serde(default)]
    pub release_groups: Vec<String>,
    pub allowed: Vec<Quality>,
    #[serde(default)]
    pub preferred: Vec<Quality>,
    #[serde(default)]
    pub ignored_words: Vec<String>,
    #[serde(default)]
    pub required_words: Vec<String>,
    #[serde(default)]
    pub preferred_words: Vec<String>,
    #[serde(default)]
    pub undesired_words: Vec<String>,
    pub episodes: Vec<RegisterEpisode>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterEpisode {
    pub season: i32,
    pub episode: i32,
    #[serde(default)]
    pub name: String,
    pub status: EpisodeStatus,
    #[serde(default)]
    pub quality: Option<Quality>,
}

#[derive(Debug, Serialize)]
pub struct RegisterShowResponse {
    pub id: i64,
    pub episodes: usize,
}

pub async fn register_show(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterShowRequest>,
) -> Result<(StatusCode, Json<RegisterShowResponse>), ApiError> {
    if request.episodes.is_empty() {
        return Err(ApiError::bad_request("a show needs at least one episode"));
    }

    let show = Show {
        id: ShowId(request.id),
        title: request.title,
        anime: request.anime,
        release_groups: request.release_groups,
        quality: CombinedQuality::combine(&request.allowed, &request.preferred),
        ignored_words: request.ignored_words,
        required_words: request.required_words,
        preferred_words: request.preferred_words,
        undesired_words: request.undesired_words,
    };

    let episodes: Vec<Episode> = request
        .episodes
        .into_iter()
        .map(|ep| {
            let mut episode_state = EpisodeState::new(ep.status);
            if let Some(quality) = ep.quality {
                episode_state.quality = quality;
            }
            Episode::new(
                ShowId(request.id),
                EpisodeKey::new(ep.season, ep.episode),
                ep.name,
                episode_state,
            )
        })
        .collect();
    let count = episodes.len();

    state.library.add_show(show, episodes);

    Ok((
        StatusCode::CREATED,
        Json(RegisterShowResponse {
            id: request.id,
            episodes: count,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct ShowSummary {
    pub id: ShowId,
    pub title: String,
    pub anime: bool,
}

pub async fn list_shows(State(state): State<Arc<AppState>>) -> Json<Vec<ShowSummary>> {
    Json(
        state
            .library
            .shows()
            .into_iter()
            .map(|show| ShowSummary {
                id: show.id,
                title: show.title.clone(),
                anime: show.anime,
            })
            .collect(),
    )
}
