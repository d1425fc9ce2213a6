use crate::{
    config::Config,
    debug,
    error::StorageError,
    management::{KEY_TOP_ARTISTS, KEY_TOP_SONGS, KEY_USER_DATA, SessionCache},
    spotify::me,
    types::Dashboard,
    warning,
};

/// What [`load_dashboard`] found.
#[derive(Debug)]
pub enum DashboardOutcome {
    /// Documents to render. Individual resources may still have failed.
    Ready { dashboard: Dashboard, from_cache: bool },
    /// No access token in the session; the user has to authorize first.
    Unauthenticated,
    /// The resource API rejected the access token. It has been dropped from
    /// the session and nothing from the rejected resource was cached.
    Reauthorize,
}

/// Loads the profile, top artists and top tracks.
///
/// With caching enabled and `refresh` unset, a session holding all three
/// documents is served without touching the network. Otherwise the three
/// requests run concurrently and every successful document is cached under
/// its own key. Failures stay attached to their resource.
///
/// # Arguments
///
/// * `config` - API base URL and the `enable_cache` switch
/// * `session` - Cache holding the access token and the cached documents
/// * `refresh` - Fetch even when all three documents are cached
///
/// # Returns
///
/// - [`DashboardOutcome::Ready`] with one `Result` per resource
/// - [`DashboardOutcome::Unauthenticated`] when the session has no access token
/// - [`DashboardOutcome::Reauthorize`] when any resource answered 401
///
/// # Errors
///
/// Only storage failures while writing the session cache. Network and API
/// errors are reported per resource inside the dashboard.
pub async fn load_dashboard(
    config: &Config,
    session: &mut SessionCache,
    refresh: bool,
) -> Result<DashboardOutcome, StorageError> {
    if config.enable_cache && !refresh {
        if let Some((profile, top_artists, top_tracks)) = session.cached_documents() {
            debug!("Serving profile, top artists and top tracks from the session cache");
            return Ok(DashboardOutcome::Ready {
                dashboard: Dashboard::cached(profile, top_artists, top_tracks),
                from_cache: true,
            });
        }
    }

    let Some(token) = session.access_token() else {
        return Ok(DashboardOutcome::Unauthenticated);
    };

    let (profile, top_artists, top_tracks) = tokio::join!(
        me::fetch_profile(config, &token),
        me::fetch_top_artists(config, &token),
        me::fetch_top_tracks(config, &token),
    );
    let dashboard = Dashboard {
        profile,
        top_artists,
        top_tracks,
    };

    if config.enable_cache {
        for (key, resource) in [
            (KEY_USER_DATA, &dashboard.profile),
            (KEY_TOP_ARTISTS, &dashboard.top_artists),
            (KEY_TOP_SONGS, &dashboard.top_tracks),
        ] {
            if let Ok(document) = resource {
                session.save(key, document.clone()).await?;
            }
        }
    }

    if dashboard.needs_reauthorization() {
        session.forget_access_token().await?;
        return Ok(DashboardOutcome::Reauthorize);
    }

    for (name, resource) in dashboard.resources() {
        if let Err(e) = resource {
            warning!("Failed to fetch {}: {}", name, e);
        }
    }

    Ok(DashboardOutcome::Ready {
        dashboard,
        from_cache: false,
    })
}
