use gradebook::web::{self, AppState};
use gradebook::{AccessGuard, Credentials, RecordService, Storage};
use reqwest::StatusCode;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    _dir: TempDir,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempfile::tempdir().expect("tmp");
        let storage = Storage::open(dir.path().join("test.db")).expect("storage");
        let state = AppState::new(
            RecordService::new(storage),
            AccessGuard::new(Credentials::new("professor", "1234")),
            "gradebook_session",
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let (tx, rx) = oneshot::channel::<()>();
        let server_state = state.clone();
        let handle = tokio::spawn(async move {
            let _ = web::serve(listener, server_state, async move {
                let _ = rx.await;
            })
            .await;
        });

        Self {
            base: format!("http://{addr}"),
            state,
            shutdown: Some(tx),
            handle: Some(handle),
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    async fn student_count(&self) -> i64 {
        self.state
            .with_records(|records| records.storage().count_students())
            .await
            .expect("task")
            .expect("count")
    }
}

fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("client")
}

fn no_redirects() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client")
}

async fn login(server: &TestServer, client: &reqwest::Client, user: &str, pass: &str) -> String {
    let resp = client
        .post(server.url("/"))
        .form(&[("username", user), ("password", pass)])
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), StatusCode::OK);
    resp.text().await.expect("body")
}

async fn register(
    server: &TestServer,
    client: &reqwest::Client,
    name: &str,
    reg: &str,
    email: &str,
) -> String {
    let resp = client
        .post(server.url("/students"))
        .form(&[("name", name), ("registration_number", reg), ("email", email)])
        .send()
        .await
        .expect("register");
    assert_eq!(resp.status(), StatusCode::OK);
    resp.text().await.expect("body")
}

async fn record(
    server: &TestServer,
    client: &reqwest::Client,
    student_id: &str,
    subject: &str,
    score: &str,
) -> String {
    let resp = client
        .post(server.url("/grades"))
        .form(&[("student_id", student_id), ("subject", subject), ("score", score)])
        .send()
        .await
        .expect("record");
    assert_eq!(resp.status(), StatusCode::OK);
    resp.text().await.expect("body")
}

#[tokio::test]
async fn login_page_loads() {
    let server = TestServer::start().await;

    let resp = browser().get(server.url("/")).send().await.expect("get");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("body").contains("Teacher Login"));

    server.stop().await;
}

#[tokio::test]
async fn login_success_lands_on_student_list() {
    let server = TestServer::start().await;

    let body = login(&server, &browser(), "professor", "1234").await;
    assert!(body.contains("Register Student"));

    let resp = no_redirects()
        .post(server.url("/"))
        .form(&[("username", "professor"), ("password", "1234")])
        .send()
        .await
        .expect("login");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/students");

    server.stop().await;
}

#[tokio::test]
async fn login_failure_shows_notice() {
    let server = TestServer::start().await;
    let client = browser();

    let body = login(&server, &client, "professor", "wrong").await;
    assert!(body.contains("Teacher Login"));
    assert!(body.contains("Invalid username or password."));

    let resp = client.get(server.url("/students")).send().await.expect("get");
    let body = resp.text().await.expect("body");
    assert!(body.contains("Teacher Login"));
    assert!(!body.contains("Register Student"));

    server.stop().await;
}

#[tokio::test]
async fn protected_pages_redirect_to_login() {
    let server = TestServer::start().await;
    let client = no_redirects();

    for path in ["/students", "/grades"] {
        let resp = client.get(server.url(path)).send().await.expect("get");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(resp.headers()["location"], "/");
    }

    let resp = client
        .post(server.url("/students"))
        .form(&[("name", "X"), ("registration_number", "1"), ("email", "")])
        .send()
        .await
        .expect("post");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(server.student_count().await, 0);

    let body = client
        .get(server.url("/"))
        .send()
        .await
        .expect("get")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Please log in to access this page."));

    server.stop().await;
}

#[tokio::test]
async fn notices_are_shown_once() {
    let server = TestServer::start().await;
    let client = browser();

    let first = client
        .get(server.url("/students"))
        .send()
        .await
        .expect("get")
        .text()
        .await
        .expect("body");
    assert!(first.contains("Please log in to access this page."));

    let second = client
        .get(server.url("/"))
        .send()
        .await
        .expect("get")
        .text()
        .await
        .expect("body");
    assert!(!second.contains("Please log in to access this page."));

    server.stop().await;
}

#[tokio::test]
async fn register_student_then_duplicate() {
    let server = TestServer::start().await;
    let client = browser();
    login(&server, &client, "professor", "1234").await;

    let body = register(&server, &client, "Aluno Teste", "123", "aluno@teste.com").await;
    assert!(body.contains("Student registered successfully!"));
    assert!(body.contains("<td>Aluno Teste</td><td>123</td><td>aluno@teste.com</td>"));

    let body = register(&server, &client, "Outro Aluno", "123", "outro@teste.com").await;
    assert!(body.contains("A student with this registration number already exists"));
    assert!(!body.contains("Outro Aluno"));
    assert_eq!(body.matches("<td>123</td>").count(), 1);
    assert_eq!(server.student_count().await, 1);

    server.stop().await;
}

#[tokio::test]
async fn register_student_requires_fields() {
    let server = TestServer::start().await;
    let client = browser();
    login(&server, &client, "professor", "1234").await;

    let body = register(&server, &client, "", "55", "").await;
    assert!(body.contains("Name and registration number are required."));
    assert_eq!(server.student_count().await, 0);

    server.stop().await;
}

#[tokio::test]
async fn record_grade_for_registered_student() {
    let server = TestServer::start().await;
    let client = browser();
    login(&server, &client, "professor", "1234").await;
    register(&server, &client, "Aluno Teste", "123", "aluno@teste.com").await;

    let student_id = server
        .state
        .with_records(|records| records.storage().student_by_registration("123"))
        .await
        .expect("task")
        .expect("query")
        .expect("student")
        .id
        .to_string();

    let form = client
        .get(server.url("/grades"))
        .send()
        .await
        .expect("get")
        .text()
        .await
        .expect("body");
    assert!(form.contains(&format!("<option value=\"{student_id}\">Aluno Teste (123)</option>")));

    let body = record(&server, &client, &student_id, "Matemática", "9.5").await;
    assert!(body.contains("Grade recorded successfully!"));
    assert!(body.contains("Recorded Grades"));
    assert!(body.contains("<td>Aluno Teste</td><td>Matemática</td><td>9.5</td>"));

    server.stop().await;
}

#[tokio::test]
async fn record_grade_rejects_bad_input() {
    let server = TestServer::start().await;
    let client = browser();
    login(&server, &client, "professor", "1234").await;
    register(&server, &client, "Ana", "1", "").await;

    let body = record(&server, &client, "1", "Math", "abc").await;
    assert!(body.contains("score must be numeric"));

    let body = record(&server, &client, "1", "", "7").await;
    assert!(body.contains("All fields are required."));

    let body = record(&server, &client, "999", "Math", "7").await;
    assert!(body.contains("Could not record grade"));
    assert!(body.contains("No grades recorded yet."));

    server.stop().await;
}

#[tokio::test]
async fn logout_ends_the_session() {
    let server = TestServer::start().await;
    let client = browser();
    login(&server, &client, "professor", "1234").await;

    let body = client
        .get(server.url("/logout"))
        .send()
        .await
        .expect("logout")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Teacher Login"));
    assert!(body.contains("You have been logged out."));

    let body = client
        .get(server.url("/students"))
        .send()
        .await
        .expect("get")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Please log in to access this page."));

    server.stop().await;
}

#[tokio::test]
async fn sessions_do_not_leak_between_clients() {
    let server = TestServer::start().await;
    let teacher = browser();
    let stranger = no_redirects();
    login(&server, &teacher, "professor", "1234").await;

    let resp = stranger
        .get(server.url("/students"))
        .send()
        .await
        .expect("get");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    server.stop().await;
}

#[tokio::test]
async fn concurrent_duplicate_registrations_admit_one() {
    let server = TestServer::start().await;
    let a = browser();
    let b = browser();
    login(&server, &a, "professor", "1234").await;
    login(&server, &b, "professor", "1234").await;

    let (first, second) = tokio::join!(
        register(&server, &a, "Ana", "777", ""),
        register(&server, &b, "Bia", "777", ""),
    );

    let successes = [&first, &second]
        .iter()
        .filter(|body| body.contains("Student registered successfully!"))
        .count();
    let duplicates = [&first, &second]
        .iter()
        .filter(|body| body.contains("already exists"))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 1);
    assert_eq!(server.student_count().await, 1);

    server.stop().await;
}

#[tokio::test]
async fn anonymous_visits_store_no_sessions() {
    let server = TestServer::start().await;
    let client = no_redirects();

    for _ in 0..50 {
        let resp = client.get(server.url("/")).send().await.expect("get");
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get("set-cookie").is_none());
    }
    assert!(server.state.guard.sessions().is_empty());

    // A redirect notice is stored until the login page shows it
    let resp = client.get(server.url("/students")).send().await.expect("get");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(server.state.guard.sessions().len(), 1);

    let body = client
        .get(server.url("/"))
        .send()
        .await
        .expect("get")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Please log in to access this page."));
    assert!(server.state.guard.sessions().is_empty());

    server.stop().await;
}

#[tokio::test]
async fn record_grade_accepts_huge_score() {
    let server = TestServer::start().await;
    let client = browser();
    login(&server, &client, "professor", "1234").await;
    register(&server, &client, "Ana", "1", "").await;

    let body = record(&server, &client, "1", "Math", "1e400").await;
    assert!(body.contains("Grade recorded successfully!"));
    assert!(body.contains("<td>Ana</td><td>Math</td><td>inf</td>"));

    let body = record(&server, &client, "abc", "Math", "7").await;
    assert!(body.contains("Could not record grade"));

    server.stop().await;
}

#[tokio::test]
async fn health_needs_no_login() {
    let server = TestServer::start().await;

    let resp = no_redirects()
        .get(server.url("/health"))
        .send()
        .await
        .expect("get");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");

    server.stop().await;
}
