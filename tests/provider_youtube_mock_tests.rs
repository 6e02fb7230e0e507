use beatbridge::api::youtube::YoutubeProvider;
use beatbridge::api::Provider;
use mockito::{Matcher, Server};
use serde_json::json;

fn durations_body(entries: &[(&str, &str)]) -> String {
    json!({
        "items": entries
            .iter()
            .map(|(id, d)| json!({ "id": id, "contentDetails": { "duration": d } }))
            .collect::<Vec<_>>()
    })
    .to_string()
}

#[test]
fn youtube_list_tracks_pages_skips_unavailable_and_fills_durations() {
    // Create mock server outside of any tokio runtime
    let mut server = Server::new();
    let base = server.url();

    let _page1 = server
        .mock("GET", "/playlistItems")
        .match_query(Matcher::Regex("maxResults=50$".into()))
        .match_header("authorization", "Bearer gtok")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    {
                        "id": "item1",
                        "snippet": {
                            "title": "Beyoncé - Halo (Official Video)",
                            "videoOwnerChannelTitle": "BeyonceVEVO",
                            "resourceId": { "videoId": "v1" }
                        },
                        "contentDetails": { "videoId": "v1" }
                    },
                    {
                        "id": "item2",
                        "snippet": { "title": "Deleted video" },
                        "contentDetails": { "videoId": "v9" }
                    }
                ],
                "nextPageToken": "p2"
            })
            .to_string(),
        )
        .create();
    let _page2 = server
        .mock("GET", "/playlistItems")
        .match_query(Matcher::Regex("pageToken=p2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [{
                    "id": "item3",
                    "snippet": { "title": "Yesterday", "videoOwnerChannelTitle": "The Beatles - Topic" },
                    "contentDetails": { "videoId": "v2" }
                }]
            })
            .to_string(),
        )
        .create();
    let _videos = server
        .mock("GET", "/videos")
        .match_query(Matcher::UrlEncoded("id".into(), "v1,v2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(durations_body(&[("v1", "PT4M21S"), ("v2", "PT2M5S")]))
        .create();

    let provider = YoutubeProvider::with_api_base("gtok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let tracks = rt.block_on(async move { provider.list_tracks("YTPL").await }).unwrap();

    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].source_id, "item1");
    assert_eq!(tracks[0].title, "Halo");
    assert_eq!(tracks[0].artists, vec!["Beyoncé".to_string()]);
    assert_eq!(tracks[0].duration_ms, 261_000);
    assert_eq!(tracks[1].title, "Yesterday");
    assert_eq!(tracks[1].artists, vec!["The Beatles".to_string()]);
    assert_eq!(tracks[1].duration_ms, 125_000);
}

#[test]
fn youtube_list_playlists_reads_item_counts() {
    let mut server = Server::new();
    let base = server.url();

    let _m = server
        .mock("GET", "/playlists")
        .match_query(Matcher::UrlEncoded("mine".into(), "true".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    { "id": "YT1", "snippet": { "title": "Gym" }, "contentDetails": { "itemCount": 40 } },
                    { "id": "YT2", "snippet": { "title": "Chill" }, "contentDetails": { "itemCount": 7 } }
                ]
            })
            .to_string(),
        )
        .create();

    let provider = YoutubeProvider::with_api_base("gtok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let playlists = rt.block_on(async move { provider.list_playlists().await }).unwrap();

    assert_eq!(playlists.len(), 2);
    assert_eq!(playlists[0].name, "Gym");
    assert_eq!(playlists[0].track_count, 40);
}

#[test]
fn youtube_search_returns_videos_with_durations() {
    let mut server = Server::new();
    let base = server.url();

    let _m_search = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "Halo Beyoncé".into()),
            Matcher::UrlEncoded("type".into(), "video".into()),
            Matcher::UrlEncoded("maxResults".into(), "10".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [
                    {
                        "id": { "kind": "youtube#video", "videoId": "v1" },
                        "snippet": { "title": "Beyoncé - Halo", "channelTitle": "BeyonceVEVO" }
                    },
                    {
                        "id": { "kind": "youtube#channel", "channelId": "c1" },
                        "snippet": { "title": "Beyoncé", "channelTitle": "Beyoncé" }
                    }
                ]
            })
            .to_string(),
        )
        .create();
    let _videos = server
        .mock("GET", "/videos")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(durations_body(&[("v1", "PT4M21S")]))
        .create();

    let provider = YoutubeProvider::with_api_base("gtok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let results = rt
        .block_on(async move { provider.search("Halo Beyoncé", 10).await })
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].destination_id, "v1");
    assert_eq!(results[0].title, "Halo");
    assert_eq!(results[0].artists, vec!["Beyoncé".to_string()]);
    assert_eq!(results[0].duration_ms, 261_000);
}

#[test]
fn youtube_search_survives_failed_duration_lookup() {
    let mut server = Server::new();
    let base = server.url();

    let _m_search = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [{
                    "id": { "videoId": "v1" },
                    "snippet": { "title": "Halo", "channelTitle": "Beyoncé - Topic" }
                }]
            })
            .to_string(),
        )
        .create();
    let _videos = server
        .mock("GET", "/videos")
        .match_query(Matcher::Any)
        .with_status(500)
        .create();

    let provider = YoutubeProvider::with_api_base("gtok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let results = rt.block_on(async move { provider.search("Halo", 5).await }).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].duration_ms, 0);
    assert_eq!(results[0].artists, vec!["Beyoncé".to_string()]);
}

#[test]
fn youtube_list_tracks_survives_failed_duration_lookup() {
    let mut server = Server::new();
    let base = server.url();

    let _items = server
        .mock("GET", "/playlistItems")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "items": [{
                    "id": "item1",
                    "snippet": { "title": "Yesterday", "videoOwnerChannelTitle": "The Beatles - Topic" },
                    "contentDetails": { "videoId": "v1" }
                }]
            })
            .to_string(),
        )
        .create();
    let _videos = server
        .mock("GET", "/videos")
        .match_query(Matcher::Any)
        .with_status(500)
        .create();

    let provider = YoutubeProvider::with_api_base("gtok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let tracks = rt.block_on(async move { provider.list_tracks("YTPL").await }).unwrap();

    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].title, "Yesterday");
    assert_eq!(tracks[0].artists, vec!["The Beatles".to_string()]);
    assert_eq!(tracks[0].duration_ms, 0);
}

#[test]
fn youtube_quota_errors_report_the_reason() {
    let mut server = Server::new();
    let base = server.url();

    let _m = server
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "error": {
                    "code": 403,
                    "message": "The request cannot be completed because you have exceeded your quota.",
                    "errors": [{ "reason": "quotaExceeded", "domain": "youtube.quota" }]
                }
            })
            .to_string(),
        )
        .create();

    let provider = YoutubeProvider::with_api_base("gtok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    let err = rt.block_on(async move { provider.search("x", 5).await }).unwrap_err();
    let s = err.to_string();
    assert!(s.contains("quotaExceeded"), "{s}");
    assert!(!s.contains("youtube.quota"), "{s}");
}

#[test]
fn youtube_create_playlist_and_add_item() {
    let mut server = Server::new();
    let base = server.url();

    let m_create = server
        .mock("POST", "/playlists")
        .match_query(Matcher::UrlEncoded("part".into(), "snippet,status".into()))
        .match_body(Matcher::PartialJson(json!({
            "snippet": { "title": "Road Trip" },
            "status": { "privacyStatus": "private" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "YTPL" }).to_string())
        .create();
    let m_add = server
        .mock("POST", "/playlistItems")
        .match_body(Matcher::PartialJson(json!({
            "snippet": { "playlistId": "YTPL", "resourceId": { "videoId": "v1" } }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id": "item1" }).to_string())
        .create();

    let provider = YoutubeProvider::with_api_base("gtok".into(), base);
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async move {
        let id = provider
            .create_playlist("Road Trip", "Transferred from Spotify with BeatBridge")
            .await
            .unwrap();
        assert_eq!(id, "YTPL");
        provider.add_track(&id, "v1").await.unwrap();
    });

    m_create.assert();
    m_add.assert();
}
