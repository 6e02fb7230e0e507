use beatbridge::api::spotify::SpotifyProvider;
use beatbridge::api::Provider;
use mockito::{Matcher, Server};
use serde_json::json;

fn spotify_track(id: &str, name: &str, artists: &[&str], duration_ms: u64) -> serde_json::Value {
    json!({
        "id": id,
        "uri": format!("spotify:track:{}", id),
        "name": name,
        "type": "track",
        "duration_ms": duration_ms,
        "artists": artists.iter().map(|a| json!({ "name": a })).collect::<Vec<_>>()
    })
}

#[test]
fn spotify_list_tracks_follows_next_and_skips_removed_items() {
    // Create mock server outside of any tokio runtime
    let mut server = Server::new();
    let base = server.url();

    let _page1 = server
        .mock("GET", "/playlists/PL1/tracks")
        .match_query(Matcher::Regex("^fields=".into()))
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    { "track": spotify_track("t1", "Halo", &["Beyoncé"], 261000) },
                    { "track": null },
                    { "track": { "id": "e1", "name": "Some Podcast", "type": "episode" } }
                ],
                "next": format!("{}/playlists/PL1/tracks?limit=100&offset=100", base)
            })
            .to_string(),
        )
        .create();
    let _page2 = server
        .mock("GET", "/playlists/PL1/tracks")
        .match_query(Matcher::Regex("offset=100".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    { "track": spotify_track("t2", "Yesterday", &["The Beatles"], 125000) },
                    { "track": spotify_track("t1", "Halo", &["Beyoncé"], 261000) }
                ],
                "next": null
            })
            .to_string(),
        )
        .create();

    let provider = SpotifyProvider::with_api_base("tok".into(), base.clone());
    let rt = tokio::runtime::Runtime::new().unwrap();
    let tracks = rt.block_on(async move { provider.list_tracks("PL1").await }).unwrap();

    let ids: Vec<&str> = tracks.iter().map(|t| t.source_id.as_str()).collect();
    // positions count skipped entries too
    assert_eq!(ids, vec!["t1#0", "t2#3", "t1#4"]);
    assert_eq!(tracks[0].title, "Halo");
    assert_eq!(tracks[0].artists, vec!["Beyoncé".to_string()]);
    assert_eq!(tracks[1].duration_ms, 125000);
}

#[test]
fn spotify_list_playlists_pages_and_reads_totals() {
    let mut server = Server::new();
    let base = server.url();

    let _page1 = server
        .mock("GET", "/me/playlists")
        .match_query(Matcher::Regex("^limit=50$".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [{ "id": "PL1", "name": "Road Trip", "tracks": { "total": 12 } }],
                "next": format!("{}/me/playlists?limit=50&offset=50", base)
            })
            .to_string(),
        )
        .create();
    let _page2 = server
        .mock("GET", "/me/playlists")
        .match_query(Matcher::Regex("offset=50".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [{ "id": "PL2", "name": "Focus", "tracks": { "total": 3 } }],
                "next": null
            })
            .to_string(),
        )
        .create();

    let provider = SpotifyProvider::with_api_base("tok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let playlists = rt.block_on(async move { provider.list_playlists().await }).unwrap();

    assert_eq!(playlists.len(), 2);
    assert_eq!(playlists[0].name, "Road Trip");
    assert_eq!(playlists[0].track_count, 12);
    assert_eq!(playlists[1].id, "PL2");
}

#[test]
fn spotify_create_playlist_and_add_track_flow() {
    let mut server = Server::new();
    let base = server.url();

    let m_me = server
        .mock("GET", "/me")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "mock_user" }).to_string())
        .expect(1)
        .create();
    let _m_create = server
        .mock("POST", "/users/mock_user/playlists")
        .match_body(Matcher::PartialJson(json!({ "name": "Road Trip", "public": false })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "mock_playlist_id" }).to_string())
        .create();
    let m_add = server
        .mock("POST", "/playlists/mock_playlist_id/tracks")
        .match_body(Matcher::Json(json!({ "uris": ["spotify:track:1"] })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json!({ "snapshot_id": "s1" }).to_string())
        .create();

    let provider = SpotifyProvider::with_api_base("tok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async move {
        let id = provider
            .create_playlist("Road Trip", "Transferred from YouTube with BeatBridge")
            .await
            .unwrap();
        assert_eq!(id, "mock_playlist_id");
        // user id is cached after the first call
        let again = provider.create_playlist("Road Trip", "").await.unwrap();
        assert_eq!(again, "mock_playlist_id");
        provider.add_track(&id, "spotify:track:1").await.unwrap();
    });

    m_me.assert();
    m_add.assert();
}

#[test]
fn spotify_search_parses_tracks() {
    let mut server = Server::new();
    let base = server.url();

    let _m_search = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "Halo Beyoncé".into()),
            Matcher::UrlEncoded("type".into(), "track".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "tracks": {
                    "items": [
                        spotify_track("h1", "Halo", &["Beyoncé"], 261640),
                        { "name": "no uri, skipped" }
                    ]
                }
            })
            .to_string(),
        )
        .create();

    let provider = SpotifyProvider::with_api_base("tok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let results = rt
        .block_on(async move { provider.search("Halo Beyoncé", 10).await })
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].destination_id, "spotify:track:h1");
    assert_eq!(results[0].duration_ms, 261640);
}

#[test]
fn spotify_errors_carry_message_not_body() {
    let mut server = Server::new();
    let base = server.url();

    let _m = server
        .mock("GET", "/playlists/nope/tracks")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"status":404,"message":"Invalid playlist Id"}}"#)
        .create();

    let provider = SpotifyProvider::with_api_base("tok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt
        .block_on(async move { provider.list_tracks("nope").await })
        .unwrap_err();
    let s = format!("{:#}", err);
    assert!(s.contains("Invalid playlist Id"), "{s}");
    assert!(!s.contains("\"status\""), "{s}");
}
