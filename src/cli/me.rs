use colored::Colorize;
use serde_json::{Value, json};
use tabled::Table;

use crate::{
    cli::open_stores,
    config::Config,
    error, info,
    management::{DashboardOutcome, load_dashboard},
    spotify, success,
    types::{
        ArtistList, ArtistTableRow, Dashboard, Profile, Resource, TrackList, TrackTableRow,
    },
    utils, warning,
};

/// Shows the profile, top artists and top tracks.
///
/// Missing or rejected tokens lead to one round of re-authorization
/// (refresh token first, then the browser flow) before giving up.
///
/// # Arguments
///
/// * `config` - Runtime configuration
/// * `refresh` - Skip the session cache and always fetch
/// * `json` - Print the raw documents instead of tables
pub async fn me(config: &Config, refresh: bool, json: bool) {
    let (mut durable, mut session) = open_stores(config).await;
    let mut reauthorized = false;

    loop {
        let pb = utils::spinner("Loading profile, top artists and top tracks...");
        let outcome = load_dashboard(config, &mut session, refresh).await;
        pb.finish_and_clear();

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => error!("Failed to update the session cache: {}", e),
        };

        match outcome {
            DashboardOutcome::Ready {
                dashboard,
                from_cache,
            } => {
                if from_cache {
                    info!("Showing cached data. Use --refresh to fetch it again.");
                }
                if json {
                    print_json(&dashboard);
                } else {
                    render(&dashboard);
                }
                return;
            }
            DashboardOutcome::Unauthenticated if !reauthorized => {
                info!("Not authorized yet. Opening the Spotify authorization page...");
                if let Err(e) = spotify::auth::authorize(config, &mut durable, &mut session).await
                {
                    error!("Authentication failed: {}", e);
                }
                success!("Authentication successful!");
            }
            DashboardOutcome::Reauthorize if !reauthorized => {
                warning!("Spotify rejected the access token. Authorizing again...");
                if let Err(e) =
                    spotify::auth::reauthorize(config, &mut durable, &mut session).await
                {
                    error!("Re-authorization failed: {}", e);
                }
            }
            DashboardOutcome::Unauthenticated | DashboardOutcome::Reauthorize => {
                error!("Still not authorized after signing in again. Run spotme logout and retry.")
            }
        }

        reauthorized = true;
    }
}

fn print_json(dashboard: &Dashboard) {
    let as_json = |resource: &Resource| match resource {
        Ok(document) => document.clone(),
        Err(e) => json!({ "error": e.to_string() }),
    };
    let doc = json!({
        "userData": as_json(&dashboard.profile),
        "topArtists": as_json(&dashboard.top_artists),
        "topSongs": as_json(&dashboard.top_tracks),
    });

    match serde_json::to_string_pretty(&doc) {
        Ok(text) => println!("{}", text),
        Err(e) => error!("Failed to serialize output: {}", e),
    }
}

fn render(dashboard: &Dashboard) {
    match &dashboard.profile {
        Ok(profile) => render_profile(profile),
        Err(e) => warning!("Profile unavailable: {}", e),
    }

    println!();
    println!("{}", "Top artists (last 4 weeks)".bold());
    match &dashboard.top_artists {
        Ok(doc) => match serde_json::from_value::<ArtistList>(doc.clone()) {
            Ok(list) if list.items.is_empty() => info!("No top artists yet."),
            Ok(list) => println!("{}", Table::new(artist_rows(&list))),
            Err(e) => warning!("Unexpected top artists document: {}", e),
        },
        Err(e) => warning!("Top artists unavailable: {}", e),
    }

    println!();
    println!("{}", "Top tracks (last 4 weeks)".bold());
    match &dashboard.top_tracks {
        Ok(doc) => match serde_json::from_value::<TrackList>(doc.clone()) {
            Ok(list) if list.items.is_empty() => info!("No top tracks yet."),
            Ok(list) => println!("{}", Table::new(track_rows(&list))),
            Err(e) => warning!("Unexpected top tracks document: {}", e),
        },
        Err(e) => warning!("Top tracks unavailable: {}", e),
    }
}

fn render_profile(doc: &Value) {
    let profile: Profile = match serde_json::from_value(doc.clone()) {
        Ok(profile) => profile,
        Err(e) => {
            warning!("Unexpected profile document: {}", e);
            return;
        }
    };

    for (label, value) in profile_lines(&profile) {
        info!("{:<13} {}", format!("{label}:"), value);
    }
}

fn profile_lines(profile: &Profile) -> Vec<(&'static str, String)> {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    vec![
        ("Display name", or_dash(&profile.display_name)),
        ("ID", profile.id.clone()),
        ("Email", or_dash(&profile.email)),
        ("URI", profile.uri.clone()),
        ("Link", or_dash(&profile.external_urls.spotify)),
        ("Profile URL", or_dash(&profile.href)),
        (
            "Image",
            profile
                .images
                .first()
                .map(|i| i.url.clone())
                .unwrap_or_else(|| "(no profile image)".to_string()),
        ),
    ]
}

fn artist_rows(list: &ArtistList) -> Vec<ArtistTableRow> {
    list.items
        .iter()
        .enumerate()
        .map(|(i, a)| ArtistTableRow {
            rank: i + 1,
            name: a.name.clone(),
            genres: utils::truncate(&a.genres.join(", "), 40),
        })
        .collect()
}

fn track_rows(list: &TrackList) -> Vec<TrackTableRow> {
    list.items
        .iter()
        .enumerate()
        .map(|(i, t)| TrackTableRow {
            rank: i + 1,
            name: t.name.clone(),
            artists: t
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            album: t.album.name.clone(),
            cover: t
                .album
                .images
                .first()
                .map(|i| i.url.clone())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_lines_fall_back_for_missing_image() {
        let profile: Profile = serde_json::from_value(json!({
            "display_name": "Alice",
            "id": "u1",
            "email": "a@example.com",
            "uri": "spotify:user:u1",
            "images": []
        }))
        .unwrap();

        let lines = profile_lines(&profile);
        assert!(lines.contains(&("Display name", "Alice".to_string())));
        assert!(lines.contains(&("Image", "(no profile image)".to_string())));
        assert!(lines.contains(&("Link", "-".to_string())));
    }

    #[test]
    fn track_rows_join_artists_and_rank_from_one() {
        let list: TrackList = serde_json::from_value(json!({
            "items": [
                {
                    "id": "t1",
                    "name": "First",
                    "artists": [{"name": "A"}, {"name": "B"}],
                    "album": {"name": "LP", "images": [{"url": "https://i.scdn.co/image/lp"}]}
                },
                {"id": "t2", "name": "Second", "artists": [{"name": "C"}], "album": {"name": "EP"}}
            ]
        }))
        .unwrap();

        let rows = track_rows(&list);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].artists, "A, B");
        assert_eq!(rows[0].cover, "https://i.scdn.co/image/lp");
        assert_eq!(rows[1].album, "EP");
        assert_eq!(rows[1].cover, "-");
    }

    #[test]
    fn artist_rows_tolerate_missing_genres() {
        let list: ArtistList =
            serde_json::from_value(json!({"items": [{"id": "a1", "name": "Solo"}]})).unwrap();

        let rows = artist_rows(&list);
        assert_eq!(rows[0].name, "Solo");
        assert_eq!(rows[0].genres, "");
    }
}
