//! 通过宿主访问页面与 API，验证缓存优先和离线兜底

use anyhow::Result;
use reqwest::header::ACCEPT;

mod common;
use common::*;

#[tokio::test]
async fn test_precached_shell_served() -> Result<()> {
    let origin = start_origin().await?;
    let haven = start_haven(&origin, "1.0.0").await?;
    let client = client()?;

    let res = client
        .get(haven.url("/static/js/bundle.js"))
        .send()
        .await?;
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["server"], "haven");
    assert!(res.headers().contains_key("haven-version"));
    assert_eq!(res.text().await?, "console.log('zimi');");

    let names = haven.ctx.caches.keys().await?;
    assert_eq!(names, vec!["zimi-app-v1.0.0"]);
    Ok(())
}

#[tokio::test]
async fn test_api_cached_and_refreshed() -> Result<()> {
    let origin = start_origin().await?;
    let haven = start_haven(&origin, "1.0.0").await?;
    let client = client()?;

    // 第一次来自网络并写入缓存
    let first: serde_json::Value = client
        .get(haven.url("/api/services"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(first["hits"], 1);

    // 第二次来自缓存，同时在后台刷新
    let second: serde_json::Value = client
        .get(haven.url("/api/services"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(second["hits"], 1);

    haven.settle().await;
    assert_eq!(origin.services_hits(), 2);

    let third: serde_json::Value = client
        .get(haven.url("/api/services"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(third["hits"], 2);
    Ok(())
}

#[tokio::test]
async fn test_offline_fallback() -> Result<()> {
    let origin = start_origin().await?;
    let haven = start_haven(&origin, "1.0.0").await?;
    let client = client()?;

    origin.go_offline().await;

    // 未缓存的页面导航回退到应用外壳
    let res = client
        .get(haven.url("/citas"))
        .header(ACCEPT, "text/html")
        .send()
        .await?;
    assert_eq!(res.status(), 200);
    assert!(res.text().await?.contains("<h1>ZIMI</h1>"));

    // 未缓存的 API 请求返回 503
    let res = client.get(haven.url("/api/doctors")).send().await?;
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await?, "Sin conexión");

    // 预缓存的资源照常可用
    let res = client.get(haven.url("/manifest.json")).send().await?;
    assert_eq!(res.status(), 200);
    Ok(())
}

#[tokio::test]
async fn test_post_not_cached() -> Result<()> {
    let origin = start_origin().await?;
    let haven = start_haven(&origin, "1.0.0").await?;
    let client = client()?;

    let res = client
        .post(haven.url("/api/appointments"))
        .json(&serde_json::json!({ "patient": "Ana", "date": "2026-10-20" }))
        .send()
        .await?;
    assert_eq!(res.status(), 201);
    assert_eq!(origin.state.appointments.lock().len(), 1);

    // POST 不会被缓存，离线时直接返回 503
    origin.go_offline().await;
    let res = client
        .post(haven.url("/api/appointments"))
        .json(&serde_json::json!({ "patient": "Ana" }))
        .send()
        .await?;
    assert_eq!(res.status(), 503);
    Ok(())
}
