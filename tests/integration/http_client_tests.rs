// tests/integration/http_client_tests.rs
use crate::common::{EMAIL, NIN};
use escrow_kyc::{
    core::{
        identity::session::KycSession, liveness::capture::EncodedSelfie,
        progress::ProgressReporter,
    },
    network::{
        error::NetworkError,
        types::{FinalCommitRequest, LivenessRequest, NinMatchRequest},
        HttpVerificationClient, VerificationApi,
    },
    storage::flags::FlagStore,
    utils::{cancel::CancelToken, config::Config},
    KycPipeline,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const NIN_MATCH_BODY: &str = concat!(
    r#"{"status":"success","match":true,"confidence":87.5,"#,
    r#""data":{"nin":"12345678901","first_name":"ADA","last_name":"OBI","#,
    r#""date_of_birth":"1990-01-01"}}"#,
);

/// Canned (status, body) per request path.
type Routes = HashMap<&'static str, (u16, &'static str)>;

/// Minimal HTTP/1.1 server: one request per connection, canned replies by
/// path. Records each request path and body.
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl StubServer {
    async fn start(routes: Routes) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let log = requests.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let routes = routes.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &routes, &log).await;
                });
            }
        });

        Self {
            base_url: format!("http://{}/kyc/", addr),
            requests,
        }
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.api.base_url = self.base_url.clone();
        config.api.timeout_secs = 5;
        config
    }

    fn paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(path, _)| path.clone()).collect()
    }

    fn body_of(&self, path: &str) -> Option<serde_json::Value> {
        self.requests
            .lock()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, body)| serde_json::from_str(body).unwrap())
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &Routes,
    log: &Mutex<Vec<(String, String)>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    log.lock().push((path.clone(), body));

    let (status, reply) = routes.get(path.as_str()).copied().unwrap_or((404, ""));
    let response = format!(
        concat!(
            "HTTP/1.1 {} Stub\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: {}\r\n",
            "Connection: close\r\n\r\n{}",
        ),
        status,
        reply.len(),
        reply
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn liveness_request() -> LivenessRequest {
    LivenessRequest {
        image: "/9j/4AAQ".into(),
    }
}

#[tokio::test]
async fn test_liveness_request_wire_format() {
    let server = StubServer::start(HashMap::from([(
        "/kyc/verify_liveness.php",
        (200, r#"{"status":"success","data":{"liveness":true,"confidence":0.98}}"#),
    )]))
    .await;
    let client = HttpVerificationClient::new(&server.config()).unwrap();

    let response = client.verify_liveness(liveness_request()).await.unwrap().unwrap();

    assert!(response.passed());
    assert_eq!(response.confidence(), Some(0.98));
    assert_eq!(
        server.body_of("/kyc/verify_liveness.php"),
        Some(serde_json::json!({"image": "/9j/4AAQ"}))
    );
}

#[tokio::test]
async fn test_non_string_status_decodes() {
    let server = StubServer::start(HashMap::from([
        (
            "/kyc/verify_liveness.php",
            (200, r#"{"status":200,"data":{"liveness":true}}"#),
        ),
        ("/kyc/final_verify.php", (200, r#"{"status":true}"#)),
    ]))
    .await;
    let client = HttpVerificationClient::new(&server.config()).unwrap();

    let response = client.verify_liveness(liveness_request()).await.unwrap().unwrap();
    assert!(response.passed());

    let commit = client
        .final_commit(FinalCommitRequest {
            email: EMAIL.into(),
            mode: "nin".into(),
            first_name: "ADA".into(),
            surname: "OBI".into(),
            dob: "1990-01-01".into(),
            nin: NIN.into(),
            bvn: String::new(),
            user_first_name: "Ada".into(),
            user_last_name: "Obi".into(),
        })
        .await
        .unwrap()
        .unwrap();
    assert!(!commit.committed());
}

#[tokio::test]
async fn test_nin_request_wire_format() {
    let server = StubServer::start(HashMap::from([(
        "/kyc/verify_nin.php",
        (200, r#"{"status":"success","match":true,"data":{"nin":"12345678901"}}"#),
    )]))
    .await;
    let client = HttpVerificationClient::new(&server.config()).unwrap();

    let response = client
        .verify_nin(NinMatchRequest {
            nin: NIN.into(),
            selfie_image: "AQID".into(),
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(response.matched, Some(true));
    assert_eq!(
        server.body_of("/kyc/verify_nin.php"),
        Some(serde_json::json!({"nin": NIN, "selfie_image": "AQID"}))
    );
}

#[tokio::test]
async fn test_error_statuses_map_to_network_errors() {
    let server = StubServer::start(HashMap::from([
        ("/kyc/verify_liveness.php", (500, "")),
        ("/kyc/verify_nin.php", (401, "")),
    ]))
    .await;
    let client = HttpVerificationClient::new(&server.config()).unwrap();

    let err = client.verify_liveness(liveness_request()).await.unwrap_err();
    assert!(matches!(err, NetworkError::Status(500)));
    assert_eq!(err.user_message(), "Server error. Try again later.");

    let err = client
        .verify_nin(NinMatchRequest {
            nin: NIN.into(),
            selfie_image: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Unauthorized request");
}

#[tokio::test]
async fn test_empty_body_is_none_and_garbage_is_decode_error() {
    let server = StubServer::start(HashMap::from([
        ("/kyc/verify_liveness.php", (200, "")),
        ("/kyc/final_verify.php", (200, "<html>oops</html>")),
    ]))
    .await;
    let client = HttpVerificationClient::new(&server.config()).unwrap();

    assert!(client.verify_liveness(liveness_request()).await.unwrap().is_none());

    let err = client
        .final_commit(FinalCommitRequest {
            email: EMAIL.into(),
            mode: "nin".into(),
            first_name: "ADA".into(),
            surname: "OBI".into(),
            dob: "1990-01-01".into(),
            nin: NIN.into(),
            bvn: String::new(),
            user_first_name: "Ada".into(),
            user_last_name: "Obi".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, NetworkError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_backend() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = Config::default();
    config.api.base_url = format!("http://{}/", addr);
    let client = HttpVerificationClient::new(&config).unwrap();

    let err = client.verify_liveness(liveness_request()).await.unwrap_err();
    assert_eq!(err.user_message(), "No internet connection.");
}

#[tokio::test]
async fn test_production_wiring_end_to_end() {
    let server = StubServer::start(HashMap::from([
        (
            "/kyc/verify_liveness.php",
            (200, r#"{"status":"success","data":{"liveness":true,"confidence":0.9}}"#),
        ),
        ("/kyc/verify_nin.php", (200, NIN_MATCH_BODY)),
        ("/kyc/final_verify.php", (200, r#"{"status":"success"}"#)),
    ]))
    .await;
    let temp_dir = tempdir().unwrap();
    let mut config = server.config();
    config.storage.path = temp_dir.path().to_string_lossy().to_string();

    let pipeline = KycPipeline::from_config(config).unwrap();
    pipeline.flags().set_account_email(EMAIL).await.unwrap();

    let mut session = KycSession::from_id_entry("nin", NIN, "Ada", "Obi").unwrap();
    session.attach_selfie(EncodedSelfie::from_bytes(&[0xFF, 0xD8, 0xFF]));

    let run = pipeline
        .verify(session, &ProgressReporter::silent(), &CancelToken::never())
        .await
        .unwrap();

    assert!(run.is_success());
    assert_eq!(run.outcome().unwrap().confidence, Some(87.5));
    assert_eq!(
        server.paths(),
        vec![
            "/kyc/verify_liveness.php",
            "/kyc/verify_nin.php",
            "/kyc/final_verify.php"
        ]
    );
    let commit = server.body_of("/kyc/final_verify.php").unwrap();
    assert_eq!(commit["email"], EMAIL);
    assert_eq!(commit["surname"], "OBI");
    assert_eq!(commit["bvn"], "");
    assert!(pipeline.flags().get_verified().await.unwrap());
}
