//! Integration tests for curatorcatalog against a mock search endpoint

use std::sync::Arc;

use curatorcatalog::probe::duration_from_bytes;
use curatorcatalog::{
    probe_or_zero, Catalog, CatalogApi, CuratorClient, DurationProbe, Error, HttpDurationProbe,
    Notice, SearchRequest, SearchSession, SkipProbe, Track, PROBE_WINDOW_BYTES,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_hit(id: u64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "slug": title.to_lowercase().replace(' ', "-"),
        "title": title,
        "author": "Test Artist",
        "bpm": 120,
        "key": "A",
        "scale": "minor",
        "energy": 0.7,
        "happy": 0.2,
        "sad": 0.6,
        "danceability": 0.4,
        "path": "",
        "image": "https://img.example/cover.jpg",
        "genre": "house, deep house",
        "related_songs": ""
    })
}

fn client_for(server: &MockServer) -> CuratorClient {
    CuratorClient::builder()
        .search_url(format!("{}/indexes/songs/search", server.uri()))
        .api_key("test-key")
        .build()
        .unwrap()
}

fn catalog_for(server: &MockServer) -> Catalog {
    Catalog::new(Arc::new(client_for(server)), Arc::new(SkipProbe))
}

#[tokio::test]
async fn test_strict_search_sends_bearer_and_strategy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/indexes/songs/search"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "q": "deep house",
            "limit": 20,
            "matchingStrategy": "all"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [mock_hit(1, "First"), mock_hit(2, "Second")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let tracks = catalog_for(&mock_server)
        .search_tracks("deep house")
        .await
        .unwrap();

    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].id, "1");
    assert_eq!(tracks[0].key, "A minor");
    assert_eq!(tracks[0].genre, "house, deep house");
    assert_eq!(tracks[0].mood.as_str(), "sad");
    assert!(tracks[0].related_songs.is_empty());
}

#[tokio::test]
async fn test_empty_strict_pass_falls_back_to_fuzzy_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "matchingStrategy": "all" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": [] })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "matchingStrategy": "frequency",
            "showMatchesPosition": true,
            "rankingScoreThreshold": 0.3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [mock_hit(9, "Close Enough")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let tracks = catalog_for(&mock_server)
        .search_tracks("clse enogh")
        .await
        .unwrap();

    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].title, "Close Enough");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("index unavailable"))
        .mount(&mock_server)
        .await;

    let catalog = catalog_for(&mock_server);
    match catalog.search_tracks("anything").await {
        Err(Error::Status { code, body }) => {
            assert_eq!(code, 503);
            assert_eq!(body, "index unavailable");
        }
        other => panic!("expected status error, got {other:?}"),
    }

    assert!(catalog.search_tracks_or_empty("anything").await.is_empty());
}

#[tokio::test]
async fn test_body_without_hits_is_malformed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server)
        .search(&SearchRequest::strict("x", 20))
        .await;
    assert!(matches!(result, Err(Error::Json(_))));
}

#[tokio::test]
async fn test_related_batch_tolerates_one_failure() {
    let mock_server = MockServer::start().await;

    for (id, title) in [(1, "One"), (3, "Three")] {
        Mock::given(method("GET"))
            .and(path(format!("/songs/{id}")))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_hit(id, title)))
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/songs/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let mut track = Track::from_hit(&Default::default(), 0.0);
    track.title = "Seed".to_string();
    track.related_songs = (1..=3)
        .map(|i| format!("{}/songs/{i}", mock_server.uri()))
        .collect();

    let related = catalog_for(&mock_server).related_tracks(&track).await;
    let titles: Vec<_> = related.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Three"]);
}

/// 16-bit mono PCM WAV of silence
fn silent_wav(rate: u32, seconds: u32) -> Vec<u8> {
    let data_len = rate * seconds * 2;
    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&rate.to_le_bytes());
    wav.extend_from_slice(&(rate * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}

#[test]
fn test_wav_duration_from_bytes() {
    let seconds = duration_from_bytes(silent_wav(8000, 2), Some("wav")).unwrap();
    assert!((seconds - 2.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_http_probe_reads_only_the_head() {
    let mock_server = MockServer::start().await;

    // Five minutes of audio, served in full even though a range was asked
    let body = silent_wav(8000, 300);
    assert!(body.len() > 10 * PROBE_WINDOW_BYTES);

    Mock::given(method("GET"))
        .and(path("/audio/long.wav"))
        .and(header(
            "range",
            format!("bytes=0-{}", PROBE_WINDOW_BYTES - 1).as_str(),
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/wav")
                .set_body_bytes(body),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let probe = HttpDurationProbe::new().unwrap();
    let seconds = probe
        .probe(&format!("{}/audio/long.wav", mock_server.uri()))
        .await
        .unwrap();
    assert!((seconds - 300.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_http_probe_without_header_in_window_is_zero() {
    let mock_server = MockServer::start().await;

    let mut body = vec![0u8; 2 * PROBE_WINDOW_BYTES];
    body.extend_from_slice(&silent_wav(8000, 1));

    Mock::given(method("GET"))
        .and(path("/audio/padded.wav"))
        .respond_with(ResponseTemplate::new(206).set_body_bytes(body))
        .mount(&mock_server)
        .await;

    let probe = HttpDurationProbe::new().unwrap();
    let url = format!("{}/audio/padded.wav", mock_server.uri());
    assert!(matches!(probe.probe(&url).await, Err(Error::Probe(_))));
    assert_eq!(probe_or_zero(&probe, &url).await, 0.0);
}

#[tokio::test]
async fn test_malformed_hit_keeps_the_rest_of_the_page() {
    let mock_server = MockServer::start().await;

    let mut broken = mock_hit(2, "Broken");
    broken["title"] = json!(404);
    broken["genre"] = json!(["rock", null]);
    broken["bpm"] = json!({ "value": 120 });

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "matchingStrategy": "all" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": [mock_hit(1, "Good"), broken, 17, mock_hit(3, "Fine")]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let tracks = catalog_for(&mock_server).search_tracks("good").await.unwrap();

    let ids: Vec<_> = tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(tracks[1].title, "404");
    assert_eq!(tracks[1].genre, "rock");
    assert_eq!(tracks[1].bpm, 0.0);
    assert_eq!(tracks[1].artist, "Test Artist");
}

#[tokio::test]
async fn test_http_probe_reads_duration() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/audio/tone.wav"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/wav")
                .set_body_bytes(silent_wav(8000, 3)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audio/missing.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let probe = HttpDurationProbe::new().unwrap();

    let seconds = probe
        .probe(&format!("{}/audio/tone.wav", mock_server.uri()))
        .await
        .unwrap();
    assert!((seconds - 3.0).abs() < 1e-6);

    let missing = format!("{}/audio/missing.mp3", mock_server.uri());
    assert!(probe.probe(&missing).await.is_err());
    assert_eq!(probe_or_zero(&probe, &missing).await, 0.0);
}

#[tokio::test]
async fn test_nonexistent_term_recovers_with_suggestions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "q": "nonexistent-term-xyz", "matchingStrategy": "all" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": [] })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "q": "nonexistent-term-xyz", "matchingStrategy": "frequency" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hits": [] })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "q": "", "limit": 10 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": (1..=10).map(|i| mock_hit(i, &format!("Suggestion {i}"))).collect::<Vec<_>>()
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = SearchSession::new(catalog_for(&mock_server));
    session.set_query("nonexistent-term-xyz").await;

    let state = session.state();
    assert_eq!(state.notice, Some(Notice::nothing_here()));
    assert_eq!(state.query, "");
    assert_eq!(state.tracks.len(), 3);
    assert!(state.tracks.iter().all(|t| t.title.starts_with("Suggestion")));
    assert!(state.error.is_none());
    assert!(!state.loading);
}
