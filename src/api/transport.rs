use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use std::time::Duration;

use super::wire::{decode_records, error_detail, NewReview, ReviewRecord};
use crate::error::ReviewError;
use crate::geo::GeoPoint;

/// Raw access to the review store
///
/// `ReviewClient` owns the policy (validation, fallback, bookkeeping);
/// implementations only move records over the wire.
#[async_trait]
pub trait ReviewTransport: Send + Sync {
    /// `GET` on the review collection, or the store's own proximity query when `near` is set
    async fn list_reviews(&self, near: Option<&GeoPoint>) -> Result<Vec<ReviewRecord>, ReviewError>;

    /// `POST` on the review collection as multipart form data
    async fn create_review(&self, review: NewReview) -> Result<ReviewRecord, ReviewError>;

    /// Raw bytes of a review photo
    async fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, ReviewError>;
}

/// reqwest-backed transport talking to the REST store
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    reviews_url: Url,
}

impl HttpTransport {
    /// `reviews_path` is joined onto `base_url`; keep its trailing slash if the store routes on it
    pub fn new(base: &str, reviews_path: &str, timeout: Duration) -> Result<Self, ReviewError> {
        let invalid = |e| ReviewError::Network(format!("invalid store URL {}: {}", base, e));

        let base_url = Url::parse(base).map_err(invalid)?;
        let mut collection_base = base_url.clone();
        if !collection_base.path().ends_with('/') {
            let path = format!("{}/", collection_base.path());
            collection_base.set_path(&path);
        }
        let reviews_url = collection_base
            .join(reviews_path.trim_start_matches('/'))
            .map_err(invalid)?;

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            reviews_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn reviews_url(&self) -> &Url {
        &self.reviews_url
    }

    /// Map non-success statuses to `ServerError`, preferring the store's `detail`
    async fn check_status(response: Response) -> Result<Response, ReviewError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_detail(&body).unwrap_or_else(|| {
            format!(
                "The review service could not complete the request ({})",
                status.canonical_reason().unwrap_or("unknown status")
            )
        });

        Err(ReviewError::Server {
            status: status.as_u16(),
            message,
        })
    }

    /// Read the whole body and decode it; a body that does not parse is the store's fault
    async fn decode_body<T>(
        response: Response,
        decode: impl FnOnce(&[u8]) -> Result<T, serde_json::Error>,
    ) -> Result<T, ReviewError> {
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        decode(&body).map_err(|e| ReviewError::Server {
            status,
            message: format!("The review service sent an unreadable response: {}", e),
        })
    }

    async fn post_form(&self, url: &Url, review: &NewReview) -> Result<Response, ReviewError> {
        let mut form = Form::new();
        for (name, value) in review.form_fields() {
            form = form.text(name, value);
        }

        if let Some(image) = &review.image {
            let part = Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str(&image.mime)?;
            form = form.part("image", part);
        }

        log::debug!("🌐 POST {} \"{}\"", url, review.title);
        Ok(self.client.post(url.clone()).multipart(form).send().await?)
    }
}

/// Where a 307/308 answer to a POST points
///
/// reqwest cannot replay a streamed multipart body, so it hands these back.
fn redirect_target(response: &Response) -> Option<Url> {
    if !matches!(
        response.status(),
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
    ) {
        return None;
    }

    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    response.url().join(location).ok()
}

#[async_trait]
impl ReviewTransport for HttpTransport {
    async fn list_reviews(&self, near: Option<&GeoPoint>) -> Result<Vec<ReviewRecord>, ReviewError> {
        let mut request = self.client.get(self.reviews_url.clone());
        if let Some(point) = near {
            request = request.query(&[
                ("latitude", point.latitude()),
                ("longitude", point.longitude()),
            ]);
        }

        log::debug!("🌐 GET {} near={:?}", self.reviews_url, near.map(|p| p.coordinates_text()));

        let response = Self::check_status(request.send().await?).await?;
        Self::decode_body(response, decode_records).await
    }

    async fn create_review(&self, review: NewReview) -> Result<ReviewRecord, ReviewError> {
        let mut response = self.post_form(&self.reviews_url, &review).await?;

        // Follow one redirect by rebuilding the form
        if let Some(target) = redirect_target(&response) {
            log::debug!("↪️  Store redirected POST to {}", target);
            response = self.post_form(&target, &review).await?;
        }

        let response = Self::check_status(response).await?;
        Self::decode_body(response, |body| serde_json::from_slice::<ReviewRecord>(body)).await
    }

    async fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, ReviewError> {
        log::debug!("🌐 GET {}", url);

        let response = Self::check_status(self.client.get(url.clone()).send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        )
    }

    fn json(status: &str, body: &str) -> String {
        response(status, "application/json", body)
    }

    /// Whether `buf` holds a full request (headers plus body)
    fn request_complete(buf: &[u8]) -> bool {
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
        let body = &buf[end + 4..];

        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok());
        match length {
            Some(length) => body.len() >= length,
            None if head.contains("transfer-encoding: chunked") => body.ends_with(b"0\r\n\r\n"),
            None => true,
        }
    }

    fn read_request_line(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        while !request_complete(&buf) {
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
        String::from_utf8_lossy(&buf)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    /// Local store answering each connection with the next canned response
    ///
    /// Returns the API base URL and a handle yielding the request lines seen.
    fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for canned in responses {
                let (mut stream, _) = listener.accept().unwrap();
                seen.push(read_request_line(&mut stream));
                stream.write_all(canned.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
            seen
        });

        (base, handle)
    }

    fn new_review() -> NewReview {
        NewReview {
            title: "Great spot".to_string(),
            comment: "Loved it".to_string(),
            rating: 5,
            latitude: 13.7563,
            longitude: 100.5018,
            address: "Bangkok".to_string(),
            user_id: 7,
            image: None,
        }
    }

    #[test]
    fn test_reviews_url() {
        let transport = HttpTransport::new("http://localhost:8000/api/", "reviews/", TIMEOUT).unwrap();
        assert_eq!(transport.reviews_url().as_str(), "http://localhost:8000/api/reviews/");

        let transport = HttpTransport::new("http://localhost:8000/api", "/reviews/", TIMEOUT).unwrap();
        assert_eq!(transport.reviews_url().as_str(), "http://localhost:8000/api/reviews/");

        let transport = HttpTransport::new("https://reviews.example.com", "reviews", TIMEOUT).unwrap();
        assert_eq!(transport.reviews_url().as_str(), "https://reviews.example.com/reviews");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpTransport::new("not a url", "reviews/", TIMEOUT).unwrap_err();
        assert!(matches!(err, ReviewError::Network(_)));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_network_error() {
        // Port 9 (discard) on localhost is almost never listening
        let transport =
            HttpTransport::new("http://127.0.0.1:9/api", "reviews/", Duration::from_secs(2)).unwrap();
        let err = transport.list_reviews(None).await.unwrap_err();
        assert!(matches!(err, ReviewError::Network(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_list_reviews_sends_proximity_query() {
        let (base, server) = serve(vec![json(
            "200 OK",
            r#"[{"review_id": 1, "place_name": "Shwedagon", "latitude": 16.7984, "longitude": 96.1496}]"#,
        )]);
        let transport = HttpTransport::new(&base, "reviews/", TIMEOUT).unwrap();
        let point = GeoPoint::new(16.7984, 96.1496).unwrap();

        let records = transport.list_reviews(Some(&point)).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].place_name.as_deref(), Some("Shwedagon"));
        let seen = server.join().unwrap();
        assert!(seen[0].starts_with("GET /api/reviews/?latitude=16.7984&longitude=96.1496 "));
    }

    #[tokio::test]
    async fn test_html_success_body_is_server_error() {
        let (base, server) = serve(vec![response("200 OK", "text/html", "<html>oops</html>")]);
        let transport = HttpTransport::new(&base, "reviews/", TIMEOUT).unwrap();

        let err = transport.list_reviews(None).await.unwrap_err();

        assert!(matches!(err, ReviewError::Server { status: 200, .. }), "got {:?}", err);
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_unreadable_create_response_is_server_error() {
        let (base, server) = serve(vec![json("201 Created", "not json")]);
        let transport = HttpTransport::new(&base, "reviews/", TIMEOUT).unwrap();

        let err = transport.create_review(new_review()).await.unwrap_err();

        assert!(matches!(err, ReviewError::Server { status: 201, .. }), "got {:?}", err);
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_error_detail_becomes_server_message() {
        let (base, server) = serve(vec![json(
            "500 Internal Server Error",
            r#"{"detail": "Error adding review: x"}"#,
        )]);
        let transport = HttpTransport::new(&base, "reviews/", TIMEOUT).unwrap();

        let err = transport.create_review(new_review()).await.unwrap_err();

        assert_eq!(
            err,
            ReviewError::Server {
                status: 500,
                message: "Error adding review: x".to_string(),
            }
        );
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_error_without_detail_gets_generic_message() {
        let (base, server) = serve(vec![response(
            "502 Bad Gateway",
            "text/html",
            "<html><body>bad gateway</body></html>",
        )]);
        let transport = HttpTransport::new(&base, "reviews/", TIMEOUT).unwrap();

        let err = transport.list_reviews(None).await.unwrap_err();

        assert_eq!(
            err,
            ReviewError::Server {
                status: 502,
                message: "The review service could not complete the request (Bad Gateway)"
                    .to_string(),
            }
        );
        server.join().unwrap();
    }

    #[tokio::test]
    async fn test_create_follows_trailing_slash_redirect() {
        let redirect = "HTTP/1.1 307 Temporary Redirect\r\nLocation: /api/reviews/\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string();
        let (base, server) = serve(vec![
            redirect,
            json("200 OK", r#"{"message": "Review added successfully", "review_id": 5, "title": "Great spot"}"#),
        ]);
        let transport = HttpTransport::new(&base, "reviews", TIMEOUT).unwrap();

        let record = transport.create_review(new_review()).await.unwrap();

        assert_eq!(record.review_id.as_deref(), Some("5"));
        let seen = server.join().unwrap();
        assert!(seen[0].starts_with("POST /api/reviews "));
        assert!(seen[1].starts_with("POST /api/reviews/ "));
    }

    #[tokio::test]
    async fn test_fetch_image_returns_bytes() {
        let (base, server) = serve(vec![response("200 OK", "image/jpeg", "JPEGDATA")]);
        let transport = HttpTransport::new(&base, "reviews/", TIMEOUT).unwrap();
        let url = Url::parse(&base).unwrap().join("/uploads/3_1700000000.jpg").unwrap();

        let bytes = transport.fetch_image(&url).await.unwrap();

        assert_eq!(bytes, b"JPEGDATA".to_vec());
        let seen = server.join().unwrap();
        assert!(seen[0].starts_with("GET /uploads/3_1700000000.jpg "));
    }
}
