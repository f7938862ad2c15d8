//! `demo-library` subcommand: materializes a synthetic file tree for every
//! `Downloaded` movie and episode currently recorded, so the importer can
//! be exercised end to end without a real indexer or download client.

use holdfast_config::Config;
use holdfast_core::domain::{EpisodeState, MovieState};
use holdfast_core::importer;
use holdfast_core::store::{EpisodeFilter, MovieFilter};

use crate::runtime::Runtime;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let runtime = Runtime::build(config).await?;
    let store = &runtime.store;

    let movies = store
        .list(MovieFilter { state: Some(MovieState::Downloaded), ..Default::default() })
        .await?;
    for movie in &movies {
        let source_dir = std::env::temp_dir().join("holdfast-demo-source");
        std::fs::create_dir_all(&source_dir)?;
        let source = source_dir.join(format!("{}.mkv", importer::sanitize(&movie.title)));
        std::fs::write(&source, b"synthetic")?;

        let destination = importer::movie_destination(&runtime.config.library.movies_root, &movie.title, &source)?;
        let result = importer::import_file(&source, &destination, &runtime.config.library.movies_root)?;
        let outcome = result.outcome;
        let path = result.file.absolute_path.display().to_string();
        tracing::info!(movie_id = movie.id.get(), ?outcome, %path, "placed synthetic movie file");
    }

    let episodes = store
        .list(EpisodeFilter { state: Some(EpisodeState::Downloaded), ..Default::default() })
        .await?;
    for episode in &episodes {
        let season = store.get(episode.season_id).await?;
        let series = store.get(season.series_id).await?;

        let source_dir = std::env::temp_dir().join("holdfast-demo-source");
        std::fs::create_dir_all(&source_dir)?;
        let source = source_dir.join(format!(
            "{}-s{:02}e{:02}.mkv",
            importer::sanitize(&series.title),
            season.season_number.value(),
            episode.episode_number.value()
        ));
        std::fs::write(&source, b"synthetic")?;

        let destination = importer::episode_destination(
            &runtime.config.library.tv_root,
            &series.title,
            season.season_number.value(),
            &source,
        )?;
        let result = importer::import_file(&source, &destination, &runtime.config.library.tv_root)?;
        let outcome = result.outcome;
        let path = result.file.absolute_path.display().to_string();
        tracing::info!(episode_id = episode.id.get(), ?outcome, %path, "placed synthetic episode file");
    }

    tracing::info!(movies = movies.len(), episodes = episodes.len(), "demo library generated");
    Ok(())
}
