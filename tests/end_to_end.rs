//! End-to-end tests for fingerprint, search and download
//!
//! The first tests run the coordinators against an in-process stub transport.
//! `test_client_against_local_server` drives the real XML-RPC client against a
//! canned HTTP responder on localhost. The live service test is ignored by
//! default.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subtitles_core::api::client::ClientConfig;
use subtitles_core::api::models::{
    DownloadResponse, EncodedSubtitle, LoginResponse, SearchCriteria, SearchResponse, StatusResponse,
    STATUS_OK,
};
use subtitles_core::api::{filter_allowed, SearchResult};
use subtitles_core::{
    DownloadCoordinator, Fingerprint, OpenSubtitlesClient, SearchCoordinator, SubtitleError,
    SubtitleSession, SubtitleTransport,
};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const SRT: &str = "1\n00:00:00,000 --> 00:00:01,000\nhi\n";

fn gzip_base64(text: &str) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    STANDARD.encode(encoder.finish().unwrap())
}

fn zero_file(dir: &TempDir, size: usize) -> std::path::PathBuf {
    let path = dir.path().join("movie.avi");
    std::fs::write(&path, vec![0u8; size]).unwrap();
    path
}

/// Service stub that only answers the fingerprint of an all-zero 200000-byte file
struct StubService {
    searches: Mutex<Vec<SearchCriteria>>,
    downloads: AtomicUsize,
}

impl StubService {
    fn new() -> Self {
        Self {
            searches: Mutex::new(Vec::new()),
            downloads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SubtitleTransport for StubService {
    async fn log_in(
        &self,
        _username: &str,
        _password: &str,
        _language: &str,
        _user_agent: &str,
    ) -> subtitles_core::Result<LoginResponse> {
        Ok(LoginResponse {
            status: Some(STATUS_OK.to_string()),
            token: Some("stub-token".to_string()),
        })
    }

    async fn no_operation(&self, _token: &str) -> subtitles_core::Result<StatusResponse> {
        Ok(StatusResponse::ok())
    }

    async fn search_subtitles(
        &self,
        token: &str,
        criteria: &[SearchCriteria],
    ) -> subtitles_core::Result<SearchResponse> {
        assert_eq!(token, "stub-token");
        self.searches.lock().unwrap().extend(criteria.iter().cloned());

        match criteria.first() {
            Some(SearchCriteria::Hash {
                movie_hash,
                movie_byte_size,
                ..
            }) if movie_hash == "0000000000030d40" && *movie_byte_size == 200_000 => {
                Ok(SearchResponse::with_results(vec![
                    SearchResult {
                        file_name: "movie.idx".to_string(),
                        format: "idx".to_string(),
                        rating: "0.0".to_string(),
                        remote_id: "41".to_string(),
                    },
                    SearchResult {
                        file_name: "movie.srt".to_string(),
                        format: "srt".to_string(),
                        rating: "8.0".to_string(),
                        remote_id: "42".to_string(),
                    },
                ]))
            }
            _ => Ok(SearchResponse::default()),
        }
    }

    async fn download_subtitles(
        &self,
        _token: &str,
        ids: &[String],
    ) -> subtitles_core::Result<DownloadResponse> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        assert_eq!(ids, ["42".to_string()]);

        Ok(DownloadResponse {
            status: Some(STATUS_OK.to_string()),
            data: vec![EncodedSubtitle {
                id: Some("42".to_string()),
                data: Some(gzip_base64(SRT)),
            }],
        })
    }
}

#[tokio::test]
async fn test_fingerprint_search_download() {
    let temp = TempDir::new().unwrap();
    let movie = zero_file(&temp, 200_000);

    let fingerprint = Fingerprint::compute(&movie).unwrap();
    assert_eq!(fingerprint.hash_hex(), "0000000000030d40");
    assert_eq!(fingerprint.size(), 200_000);

    let service = Arc::new(StubService::new());
    let session = Arc::new(SubtitleSession::new(service.clone(), "eng", "Totem"));

    let results = SearchCoordinator::new(Arc::clone(&session))
        .search(&fingerprint, "Movie")
        .await
        .unwrap();
    assert_eq!(results.len(), 2);

    let shown = filter_allowed(&results);
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].remote_id, "42");
    assert_eq!(shown[0].format, "srt");

    // Hash hit: no title query
    assert_eq!(service.searches.lock().unwrap().len(), 1);

    let subtitle = DownloadCoordinator::new(session)
        .download(&shown[0].remote_id)
        .await
        .unwrap();
    assert_eq!(subtitle.content, SRT.as_bytes());
    assert_eq!(service.downloads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_small_file_never_reaches_service() {
    let temp = TempDir::new().unwrap();
    let movie = zero_file(&temp, 131_071);

    let err = Fingerprint::compute(&movie).unwrap_err();
    assert!(err.is_fingerprint_error());
    assert!(matches!(err, SubtitleError::SizeTooSmall { size: 131_071, .. }));
}

#[tokio::test]
async fn test_unknown_movie_falls_back_to_title() {
    let temp = TempDir::new().unwrap();
    let movie = temp.path().join("other.avi");
    std::fs::write(&movie, vec![1u8; 150_000]).unwrap();

    let fingerprint = Fingerprint::compute(&movie).unwrap();
    let service = Arc::new(StubService::new());
    let session = Arc::new(SubtitleSession::new(service.clone(), "ger", "Totem"));

    let err = SearchCoordinator::new(session)
        .search(&fingerprint, "Other Movie")
        .await
        .unwrap_err();

    assert!(matches!(err, SubtitleError::NoResults));
    let searches = service.searches.lock().unwrap();
    assert_eq!(searches.len(), 2);
    assert!(matches!(
        &searches[1],
        SearchCriteria::Title { language, query } if language == "ger" && query == "Other Movie"
    ));
}

// ============================================================================
// Local XML-RPC responder
// ============================================================================

fn method_response(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?><methodResponse><params><param><value>{}</value></param></params></methodResponse>",
        body
    )
}

fn canned_reply(request: &str) -> String {
    if request.contains("<methodName>LogIn</methodName>") {
        method_response(
            "<struct>\
             <member><name>token</name><value><string>srv-token</string></value></member>\
             <member><name>status</name><value><string>200 OK</string></value></member>\
             <member><name>seconds</name><value><double>0.01</double></value></member>\
             </struct>",
        )
    } else if request.contains("<methodName>SearchSubtitles</methodName>") {
        if request.contains("moviehash") {
            method_response(
                "<struct>\
                 <member><name>status</name><value><string>200 OK</string></value></member>\
                 <member><name>data</name><value><boolean>0</boolean></value></member>\
                 </struct>",
            )
        } else {
            method_response(
                "<struct>\
                 <member><name>status</name><value><string>200 OK</string></value></member>\
                 <member><name>data</name><value><array><data><value><struct>\
                 <member><name>SubFileName</name><value><string>Movie.srt</string></value></member>\
                 <member><name>SubFormat</name><value><string>srt</string></value></member>\
                 <member><name>SubRating</name><value><string>9.5</string></value></member>\
                 <member><name>IDSubtitleFile</name><value><string>777</string></value></member>\
                 </struct></value></data></array></value></member>\
                 </struct>",
            )
        }
    } else if request.contains("<methodName>DownloadSubtitles</methodName>") {
        method_response(&format!(
            "<struct>\
             <member><name>status</name><value><string>200 OK</string></value></member>\
             <member><name>data</name><value><array><data><value><struct>\
             <member><name>idsubtitlefile</name><value><string>777</string></value></member>\
             <member><name>data</name><value><string>{}</string></value></member>\
             </struct></value></data></array></value></member>\
             </struct>",
            gzip_base64(SRT)
        ))
    } else {
        "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
         <member><name>faultCode</name><value><int>1</int></value></member>\
         <member><name>faultString</name><value><string>unknown method</string></value></member>\
         </struct></value></fault></methodResponse>"
            .to_string()
    }
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buffer);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buffer).into_owned()
}

async fn spawn_responder() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let request = read_request(&mut stream).await;
                let body = canned_reply(&request);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{}/xml-rpc", address)
}

#[tokio::test]
async fn test_client_against_local_server() {
    let endpoint = spawn_responder().await;
    let config = ClientConfig::builder()
        .endpoint(endpoint)
        .timeout(Duration::from_secs(5))
        .max_attempts(1)
        .build();
    let client = OpenSubtitlesClient::with_config(config).unwrap();
    let session = Arc::new(SubtitleSession::new(Arc::new(client), "eng", "Totem"));

    let fingerprint = Fingerprint::from_parts(0x1234, 200_000);
    let results = SearchCoordinator::new(Arc::clone(&session))
        .search(&fingerprint, "Movie")
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].remote_id, "777");
    assert_eq!(results[0].rating, "9.5");
    assert!(session.is_logged_in().await);

    let subtitle = DownloadCoordinator::new(session).download("777").await.unwrap();
    assert_eq!(subtitle.text(), SRT);
}

#[tokio::test]
#[ignore] // Run with: cargo test --test end_to_end -- --ignored --nocapture
async fn test_live_service_login() -> Result<(), Box<dyn std::error::Error>> {
    let client = OpenSubtitlesClient::new()?;
    let login = client.log_in("", "", "eng", "Totem").await?;

    println!("LogIn status: {:?}", login.status);
    assert!(login.is_ok());
    Ok(())
}
