//! Postgres repository tests. Need a reachable database configured through
//! the `ADBOARD_DB_*` variables; run with `--features db-tests`.
#![cfg(feature = "db-tests")]

use adboard_api::{ApiResult, DbConfig, PgAdRepository};
use adboard_core::{ListQuery, SortKey};
use adboard_storage::AdRepository;
use adboard_test_utils::fixtures::bike_input;
use rust_decimal::Decimal;

async fn test_repository() -> ApiResult<PgAdRepository> {
    let repository = PgAdRepository::from_config(&DbConfig::from_env()?)?;
    repository.migrate().await?;
    Ok(repository)
}

#[tokio::test]
async fn test_create_then_get_round_trips_images_in_order() -> ApiResult<()> {
    let repo = test_repository().await?;

    let created = repo.create(&bike_input()).await?;
    assert!(created.id > 0);
    assert_eq!(created.main_image_url.as_deref(), Some("https://img.example/bike-1.jpg"));

    let fetched = repo.get_by_id(created.id).await?;
    let fetched = fetched.expect("created ad must be readable");
    assert_eq!(fetched.title, "Road bike");
    assert_eq!(fetched.price, Decimal::new(45000, 2));
    assert_eq!(fetched.image_urls, created.image_urls);
    assert_eq!(fetched.description, created.description);
    Ok(())
}

#[tokio::test]
async fn test_get_missing_ad_is_none() -> ApiResult<()> {
    let repo = test_repository().await?;
    assert!(repo.get_by_id(i64::MAX).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_list_is_ordered_and_paged() -> ApiResult<()> {
    let repo = test_repository().await?;
    for _ in 0..3 {
        repo.create(&bike_input()).await?;
    }

    let query = ListQuery::new(0, 10).sorted_by(SortKey::Price, true);
    let page = repo.list(&query).await?;
    assert!(page.len() <= 10);
    assert!(page
        .windows(2)
        .all(|w| (w[0].price, w[0].id) < (w[1].price, w[1].id)));

    let past_end = repo.list(&ListQuery::new(1_000_000_000, 10)).await?;
    assert!(past_end.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_ping() -> ApiResult<()> {
    let repo = test_repository().await?;
    repo.ping().await?;
    Ok(())
}
