//! Game configuration registration.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::GameEntity, dto::game::{CreateGameRequest, GameView}, error::ServiceError,
    state::SharedState,
};

/// Persist a new game configuration for a host.
///
/// Category ordering is preserved exactly as submitted; it drives the
/// remainder distribution when assignments are generated.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameView, ServiceError> {
    let store = state.require_store().await?;

    let game = GameEntity {
        id: Uuid::new_v4(),
        host_id: request.host_id,
        total_rounds: request.total_rounds,
        questions_per_round: request.questions_per_round,
        categories: request.categories,
        created_at: SystemTime::now(),
    };
    store.save_game(game.clone()).await?;

    info!(
        game_id = %game.id,
        host_id = %game.host_id,
        rounds = game.total_rounds,
        "game registered"
    );
    Ok(game.into())
}

/// Fetch a stored game configuration.
pub async fn find_game(state: &SharedState, game_id: Uuid) -> Result<GameView, ServiceError> {
    let Some(game) = state.require_store().await?.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };
    Ok(game.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{models::Category, store::memory::MemoryGameStore},
        state::AppState,
    };

    #[tokio::test]
    async fn created_games_preserve_category_order() {
        let state = AppState::new(AppConfig::default());
        state.install_store(Arc::new(MemoryGameStore::new())).await;

        let created = create_game(
            &state,
            CreateGameRequest {
                host_id: Uuid::new_v4(),
                total_rounds: 3,
                questions_per_round: 10,
                categories: vec![Category::Music, Category::General, Category::History],
            },
        )
        .await
        .unwrap();

        let fetched = find_game(&state, created.id).await.unwrap();
        assert_eq!(
            fetched.categories,
            vec![Category::Music, Category::General, Category::History]
        );
    }

    #[tokio::test]
    async fn unknown_games_are_not_found() {
        let state = AppState::new(AppConfig::default());
        state.install_store(Arc::new(MemoryGameStore::new())).await;

        let err = find_game(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
