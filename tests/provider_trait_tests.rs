use beatbridge::api::mock::MockProvider;
use beatbridge::api::spotify::SpotifyProvider;
use beatbridge::api::youtube::YoutubeProvider;
use beatbridge::api::Provider;
use beatbridge::models::ProviderKind;

#[test]
fn test_mock_provider_trait() {
    let mock = MockProvider::new(ProviderKind::Youtube);
    assert_eq!(mock.name(), "mock");
    assert_eq!(mock.kind(), ProviderKind::Youtube);
    assert!(mock.is_authenticated());
    assert!(!MockProvider::new(ProviderKind::Spotify).unauthenticated().is_authenticated());
}

#[test]
fn test_spotify_provider_trait() {
    let spotify = SpotifyProvider::new("token".to_string());
    assert_eq!(spotify.name(), "spotify");
    assert_eq!(spotify.kind(), ProviderKind::Spotify);
    assert!(spotify.is_authenticated());
}

#[test]
fn test_youtube_provider_trait() {
    let youtube = YoutubeProvider::new("token".to_string());
    assert_eq!(youtube.name(), "youtube");
    assert_eq!(youtube.kind().session_key(), "google");
    assert!(youtube.is_authenticated());
}

#[test]
fn test_providers_not_authenticated() {
    assert!(!SpotifyProvider::new(String::new()).is_authenticated());
    assert!(!YoutubeProvider::new("   ".to_string()).is_authenticated());
}

#[tokio::test]
async fn test_mock_provider_playlist_ops() {
    let mock = MockProvider::new(ProviderKind::Spotify);
    let id = mock.create_playlist("Road Trip", "desc").await.unwrap();
    assert_eq!(id, "mock-playlist-Road Trip");
    mock.add_track(&id, "spotify:track:1").await.unwrap();
    assert!(mock.search("anything", 10).await.unwrap().is_empty());
    assert!(mock.list_tracks("unknown").await.is_err());
    assert_eq!(mock.added(), vec![(id, "spotify:track:1".to_string())]);
}
