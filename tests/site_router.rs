mod site_stub;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt as _;

use classroom::cli::SiteArgs;
use classroom::config::SiteConfig;
use classroom::fetch::SiteClient;
use classroom::site::{SiteState, router};
use site_stub::SiteStub;

fn site_for(stub: &SiteStub) -> anyhow::Result<axum::Router> {
    let args = SiteArgs {
        base_url: Some(stub.base_url.clone()),
        grades_sheet_url: Some(stub.url("sheets/grades.csv")),
        comments_sheet_url: Some(stub.url("sheets/comments.csv")),
        ..SiteArgs::default()
    };
    let client = SiteClient::new(SiteConfig::resolve(&args)?)?;
    Ok(router(SiteState { client }, None))
}

async fn get(app: axum::Router, uri: &str) -> anyhow::Result<(StatusCode, String)> {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, String::from_utf8(bytes.to_vec())?))
}

#[tokio::test]
async fn healthz_is_ok() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let (status, body) = get(site_for(&stub)?, "/healthz").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok\n");
    Ok(())
}

#[tokio::test]
async fn root_serves_the_class_page() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let (status, body) = get(site_for(&stub)?, "/?filter=classes").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"<a class="nav-link active" href="index.html">Classes</a>"#));
    assert!(body.contains("Lesson 3: Greetings"));
    assert!(!body.contains("No School"));
    Ok(())
}

#[tokio::test]
async fn resources_accept_repeated_tags() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let (status, body) = get(
        site_for(&stub)?,
        "/resources.html?q=&tag=letters&tag=video",
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Alphabet Song"));
    assert!(!body.contains("Letter Tracing"));
    Ok(())
}

#[tokio::test]
async fn progress_without_a_form_shows_the_empty_page() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let (status, body) = get(site_for(&stub)?, "/progress.html").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Progress for …"));
    Ok(())
}

#[tokio::test]
async fn progress_lookup_renders_the_report() -> anyhow::Result<()> {
    let stub = SiteStub::classroom();
    let (status, body) = get(
        site_for(&stub)?,
        "/progress.html?last_name=Haddad&year=2012&month=3&day=4",
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Progress for Lina Haddad"));
    assert!(body.contains("92%"));
    Ok(())
}

#[tokio::test]
async fn failed_data_load_degrades_to_a_message() -> anyhow::Result<()> {
    let stub = SiteStub::spawn(&[]);
    let (status, body) = get(site_for(&stub)?, "/resources.html").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Could not load resources right now. Please refresh."));
    Ok(())
}
