//! Live integration tests for brickdesk-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database. The `migrations`
//! path is relative to `crates/brickdesk-db/`.

use std::time::Duration;

use brickdesk_core::{
    BestOfferThresholds, CatalogSet, DiscoveryStatus, InventoryStatus, MinifigInventoryItem,
    MinifigMarketData, NewPlatformOrder, OrderStatus, Platform,
};
use brickdesk_db::{
    claim_minifig_for_publish, claim_pending_amazon_updates, complete_sync_run,
    create_purchase_with_items, create_sync_run, enqueue_amazon_update, fail_sync_run,
    get_minifig_item, get_sync_run, insert_price_snapshot, list_arbitrage_candidates,
    list_discovery_candidates, list_found_asins, list_inventory, list_platform_orders,
    list_sets_missing_rrp, list_snapshot_prices, mark_minifig_published, profit_and_loss,
    record_amazon_outcome, record_discovery_result, release_amazon_claims,
    revert_minifig_to_staged, set_uk_rrp, stage_minifig_listing, start_sync_run,
    transition_inventory_status, update_source_prices, upsert_asin_pricing, upsert_brickset_set,
    upsert_minifig_item, upsert_platform_order, DbError, DiscoveryUpdate, InventoryFilters,
    NewAmazonQueueEntry, NewInventoryItem, NewPurchase, OrderFilters, StagedListing,
    TransitionDetails, KEEPA_BUYBOX_SOURCE,
};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

const LEASE: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn d(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn date(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
}

fn purchase() -> NewPurchase {
    NewPurchase {
        purchase_date: date(2026, 3, 4),
        source: "Facebook Marketplace".to_string(),
        description: Some("job lot".to_string()),
        total_cost: d(6000),
        payment_method: Some("bank transfer".to_string()),
    }
}

fn item(set_number: &str, cost: i64) -> NewInventoryItem {
    NewInventoryItem {
        set_number: set_number.to_string(),
        item_name: None,
        condition: "new".to_string(),
        cost: d(cost),
        sku: None,
    }
}

fn catalog_set(set_number: &str, ean: Option<&str>) -> CatalogSet {
    CatalogSet {
        set_number: set_number.to_string(),
        set_name: format!("Set {set_number}"),
        theme: Some("Star Wars".to_string()),
        year: Some(2024),
        ean: ean.map(str::to_string),
        upc: None,
        uk_retail_price: None,
        us_retail_price: Some(d(4999)),
        de_retail_price: None,
    }
}

fn minifig() -> MinifigInventoryItem {
    MinifigInventoryItem {
        bricqer_item_id: "bq-881".to_string(),
        bricklink_id: Some("sw0001a".to_string()),
        name: "Battle Droid".to_string(),
        condition: "used".to_string(),
        bricqer_price: Some(d(450)),
        cost: Some(d(120)),
        quantity: 1,
    }
}

fn staged(offer: Option<&str>) -> StagedListing {
    StagedListing {
        market: MinifigMarketData {
            bricklink_avg_sold: Some(d(400)),
            ebay_avg_sold: Some(d(520)),
            ebay_sold_count: 6,
            ebay_active_count: 4,
            ebay_sell_through_pct: Some(Decimal::new(60, 0)),
        },
        meets_threshold: true,
        recommended_price: Some(d(549)),
        best_offer: Some(BestOfferThresholds {
            auto_accept: d(522),
            auto_decline: d(412),
        }),
        ebay_offer_id: offer.map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Purchases and inventory
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn purchase_with_items_is_created_in_backlog(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let created = create_purchase_with_items(
        &pool,
        user,
        &purchase(),
        &[item("75192-1", 4000), item("10294-1", 2000)],
    )
    .await
    .expect("create purchase");

    assert_eq!(created.items.len(), 2);
    assert!(created.items.iter().all(|i| i.status == "BACKLOG"));
    assert!(created
        .items
        .iter()
        .all(|i| i.purchase_id == Some(created.purchase.id)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_item_insert_rolls_back_purchase(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    // Negative cost passes input validation but violates the column CHECK.
    let result =
        create_purchase_with_items(&pool, user, &purchase(), &[item("75192-1", 1000), item("1-1", -5)])
            .await;
    assert!(matches!(result, Err(DbError::Sqlx(_))), "got {result:?}");

    let purchases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE user_id = $1")
        .bind(user)
        .fetch_one(&pool)
        .await
        .unwrap();
    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items WHERE user_id = $1")
        .bind(user)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(purchases, 0);
    assert_eq!(items, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn inventory_follows_backlog_listed_sold(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let created = create_purchase_with_items(&pool, user, &purchase(), &[item("75192-1", 4000)])
        .await
        .unwrap();
    let id = created.items[0].id;

    let err = transition_inventory_status(
        &pool,
        user,
        id,
        InventoryStatus::Sold,
        &TransitionDetails::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidInventoryTransition {
            from: InventoryStatus::Backlog,
            to: InventoryStatus::Sold,
            ..
        }
    ));

    let listed = transition_inventory_status(
        &pool,
        user,
        id,
        InventoryStatus::Listed,
        &TransitionDetails {
            listing_platform: Some("amazon".to_string()),
            listing_price: Some(d(7999)),
            sold_price: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(listed.status, "LISTED");
    assert_eq!(listed.listing_price, Some(d(7999)));

    let sold = transition_inventory_status(
        &pool,
        user,
        id,
        InventoryStatus::Sold,
        &TransitionDetails::default(),
    )
    .await
    .unwrap();
    assert_eq!(sold.status, "SOLD");
    assert_eq!(sold.sold_price, Some(d(7999)), "falls back to listing price");
    assert!(sold.sold_at.is_some());

    let listed_only = list_inventory(
        &pool,
        user,
        InventoryFilters {
            status: Some(InventoryStatus::Listed),
            set_number: None,
            limit: 10,
        },
    )
    .await
    .unwrap();
    assert!(listed_only.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn inventory_is_isolated_per_tenant(pool: sqlx::PgPool) {
    let owner = Uuid::new_v4();
    let created = create_purchase_with_items(&pool, owner, &purchase(), &[item("75192-1", 4000)])
        .await
        .unwrap();

    let err = transition_inventory_status(
        &pool,
        Uuid::new_v4(),
        created.items[0].id,
        InventoryStatus::Listed,
        &TransitionDetails::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Orders and reports
// ---------------------------------------------------------------------------

fn order(id: &str, status: OrderStatus) -> NewPlatformOrder {
    NewPlatformOrder {
        platform: Platform::Bricqer,
        platform_order_id: id.to_string(),
        status,
        order_date: Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap(),
        buyer_name: Some("A Buyer".to_string()),
        item_count: 2,
        subtotal: d(2000),
        shipping: d(300),
        fees: d(150),
        total: d(2300),
        currency: "GBP".to_string(),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn order_upsert_is_idempotent(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let first = upsert_platform_order(&pool, user, &order("1001", OrderStatus::Paid))
        .await
        .unwrap();
    let second = upsert_platform_order(&pool, user, &order("1001", OrderStatus::Shipped))
        .await
        .unwrap();
    assert_eq!(first, second);

    let rows = list_platform_orders(
        &pool,
        user,
        OrderFilters {
            platform: Some(Platform::Bricqer),
            status: None,
            limit: 10,
        },
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, "shipped");
}

#[sqlx::test(migrations = "../../migrations")]
async fn profit_and_loss_groups_by_month(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let created = create_purchase_with_items(&pool, user, &purchase(), &[item("75192-1", 4000)])
        .await
        .unwrap();
    let id = created.items[0].id;
    transition_inventory_status(
        &pool,
        user,
        id,
        InventoryStatus::Listed,
        &TransitionDetails::default(),
    )
    .await
    .unwrap();
    transition_inventory_status(
        &pool,
        user,
        id,
        InventoryStatus::Sold,
        &TransitionDetails {
            sold_price: Some(d(7000)),
            ..TransitionDetails::default()
        },
    )
    .await
    .unwrap();
    sqlx::query("UPDATE inventory_items SET sold_at = '2026-03-15T10:00:00Z' WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();
    upsert_platform_order(&pool, user, &order("2001", OrderStatus::Completed))
        .await
        .unwrap();
    upsert_platform_order(&pool, user, &order("2002", OrderStatus::Cancelled))
        .await
        .unwrap();

    let rows = profit_and_loss(&pool, user, date(2026, 1, 1), date(2027, 1, 1))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let march = &rows[0];
    assert_eq!(march.month, date(2026, 3, 1));
    assert_eq!(march.items_sold, 1);
    assert_eq!(march.revenue, d(7000));
    assert_eq!(march.cost_of_goods, d(4000));
    assert_eq!(march.platform_fees, d(150));
    assert_eq!(march.purchase_spend, d(6000));
    assert_eq!(march.gross_profit, d(2850));

    let err = profit_and_loss(&pool, user, date(2026, 5, 1), date(2026, 5, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));
}

// ---------------------------------------------------------------------------
// Minifig listing claim
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn publish_claim_is_exclusive(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let id = upsert_minifig_item(&pool, user, &minifig()).await.unwrap();

    assert!(
        claim_minifig_for_publish(&pool, user, id).await.unwrap().is_none(),
        "NOT_LISTED items cannot be claimed"
    );

    stage_minifig_listing(&pool, user, id, &staged(Some("offer-1")))
        .await
        .unwrap();

    let claimed = claim_minifig_for_publish(&pool, user, id).await.unwrap();
    assert_eq!(claimed.map(|r| r.listing_status).as_deref(), Some("PUBLISHING"));
    assert!(claim_minifig_for_publish(&pool, user, id).await.unwrap().is_none());

    let published = mark_minifig_published(&pool, id, "110011223344").await.unwrap();
    assert_eq!(published.listing_status, "PUBLISHED");
    assert_eq!(published.ebay_listing_id.as_deref(), Some("110011223344"));

    let err = stage_minifig_listing(&pool, user, id, &staged(None))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ListingStateConflict { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn claim_checks_publishability_in_the_update(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let id = upsert_minifig_item(&pool, user, &minifig()).await.unwrap();

    stage_minifig_listing(&pool, user, id, &staged(None))
        .await
        .unwrap();
    assert!(
        claim_minifig_for_publish(&pool, user, id).await.unwrap().is_none(),
        "no offer id"
    );

    let below = StagedListing {
        meets_threshold: false,
        ..staged(Some("offer-2"))
    };
    stage_minifig_listing(&pool, user, id, &below).await.unwrap();
    assert!(
        claim_minifig_for_publish(&pool, user, id).await.unwrap().is_none(),
        "below threshold"
    );
    let row = get_minifig_item(&pool, user, id).await.unwrap();
    assert_eq!(row.listing_status, "STAGED");

    stage_minifig_listing(&pool, user, id, &staged(None))
        .await
        .unwrap();
    let claimed = claim_minifig_for_publish(&pool, user, id)
        .await
        .unwrap()
        .expect("publishable row is claimed");
    assert_eq!(claimed.ebay_offer_id.as_deref(), Some("offer-2"));
    assert_eq!(claimed.meets_threshold, Some(true));
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_publish_reverts_to_staged(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let id = upsert_minifig_item(&pool, user, &minifig()).await.unwrap();
    stage_minifig_listing(&pool, user, id, &staged(Some("offer-1")))
        .await
        .unwrap();
    claim_minifig_for_publish(&pool, user, id).await.unwrap();

    revert_minifig_to_staged(&pool, id, "eBay returned 500")
        .await
        .unwrap();

    let row = get_minifig_item(&pool, user, id).await.unwrap();
    assert_eq!(row.listing_status, "STAGED");
    assert_eq!(row.last_error.as_deref(), Some("eBay returned 500"));
    assert!(
        revert_minifig_to_staged(&pool, id, "again").await.is_err(),
        "revert requires PUBLISHING"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn minifig_resync_keeps_listing_state(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let id = upsert_minifig_item(&pool, user, &minifig()).await.unwrap();
    stage_minifig_listing(&pool, user, id, &staged(Some("offer-1")))
        .await
        .unwrap();

    let mut refreshed = minifig();
    refreshed.quantity = 3;
    let again = upsert_minifig_item(&pool, user, &refreshed).await.unwrap();
    assert_eq!(again, id);

    let row = get_minifig_item(&pool, user, id).await.unwrap();
    assert_eq!(row.quantity, 3);
    assert_eq!(row.listing_status, "STAGED");
    assert_eq!(row.ebay_offer_id.as_deref(), Some("offer-1"));
}

// ---------------------------------------------------------------------------
// Catalogue, discovery, pricing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn discovery_candidates_page_and_resolve(pool: sqlx::PgPool) {
    for n in ["10001-1", "10002-1", "10003-1"] {
        upsert_brickset_set(&pool, &catalog_set(n, Some("5702017"))).await.unwrap();
    }

    let page = list_discovery_candidates(&pool, 0, 2).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].set_number, "10001-1");

    let alternatives = vec!["B0ALT00001".to_string()];
    record_discovery_result(
        &pool,
        &DiscoveryUpdate {
            set_number: "10001-1",
            status: DiscoveryStatus::Found,
            asin: Some("B0FOUND001"),
            match_method: Some("ean"),
            match_confidence: Some(100),
            amazon_title: Some("LEGO Set 10001"),
            alternative_asins: &alternatives,
            error_message: None,
        },
    )
    .await
    .unwrap();

    let remaining = list_discovery_candidates(&pool, 0, 10).await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|c| c.set_number != "10001-1"));

    let found = list_found_asins(&pool, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].asin, "B0FOUND001");

    let err = record_discovery_result(
        &pool,
        &DiscoveryUpdate {
            set_number: "99999-1",
            status: DiscoveryStatus::NotFound,
            asin: None,
            match_method: None,
            match_confidence: None,
            amazon_title: None,
            alternative_asins: &[],
            error_message: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn price_snapshots_ignore_duplicate_days(pool: sqlx::PgPool) {
    upsert_brickset_set(&pool, &catalog_set("10001-1", None)).await.unwrap();
    let day = date(2026, 2, 1);

    assert!(
        insert_price_snapshot(&pool, "10001-1", Some("B0X"), day, d(4500), KEEPA_BUYBOX_SOURCE)
            .await
            .unwrap()
    );
    assert!(
        !insert_price_snapshot(&pool, "10001-1", Some("B0X"), day, d(4700), KEEPA_BUYBOX_SOURCE)
            .await
            .unwrap()
    );

    let prices = list_snapshot_prices(&pool, &["10001-1".to_string()], KEEPA_BUYBOX_SOURCE)
        .await
        .unwrap();
    assert_eq!(prices, vec![("10001-1".to_string(), d(4500))]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_rrp_includes_fallback_inputs(pool: sqlx::PgPool) {
    upsert_brickset_set(&pool, &catalog_set("10001-1", None)).await.unwrap();
    let mut priced = catalog_set("10002-1", None);
    priced.uk_retail_price = Some(d(3999));
    upsert_brickset_set(&pool, &priced).await.unwrap();
    upsert_asin_pricing(&pool, "10001-1", "B0X", Some(d(4200)), None)
        .await
        .unwrap();

    let missing = list_sets_missing_rrp(&pool).await.unwrap();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].set_number, "10001-1");
    assert_eq!(missing[0].amazon_price, Some(d(4200)));
    assert_eq!(missing[0].us_retail_price, Some(d(4999)));

    assert!(set_uk_rrp(&pool, "10001-1", d(4200), "amazon").await.unwrap());
    assert!(list_sets_missing_rrp(&pool).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn source_prices_update_only_what_was_given(pool: sqlx::PgPool) {
    upsert_brickset_set(&pool, &catalog_set("10001-1", None)).await.unwrap();
    upsert_asin_pricing(&pool, "10001-1", "B0X", Some(d(9999)), None)
        .await
        .unwrap();

    assert!(update_source_prices(&pool, "10001-1", Some(d(5000)), Some(d(6000)))
        .await
        .unwrap());
    assert!(update_source_prices(&pool, "10001-1", None, Some(d(5500)))
        .await
        .unwrap());
    assert!(!update_source_prices(&pool, "99999-1", Some(d(100)), None)
        .await
        .unwrap());
    assert!(matches!(
        update_source_prices(&pool, "10001-1", Some(d(-1)), None).await,
        Err(DbError::InvalidInput {
            field: "bricklink_min_price",
            ..
        })
    ));

    let rows = list_arbitrage_candidates(&pool, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].bricklink_min_price, Some(d(5000)));
    assert_eq!(rows[0].ebay_min_price, Some(d(5500)));
}

// ---------------------------------------------------------------------------
// Amazon queue and sync runs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn amazon_queue_claim_and_outcome(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let entry = NewAmazonQueueEntry {
        inventory_item_id: None,
        sku: "LEGO-75192-N".to_string(),
        asin: Some("B075SDMMMV".to_string()),
        price: Some(d(64999)),
        quantity: Some(1),
    };
    let id = enqueue_amazon_update(&pool, user, &entry).await.unwrap();

    let claimed = claim_pending_amazon_updates(&pool, user, 10, LEASE).await.unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].status, "processing");
    assert!(claimed[0].claimed_at.is_some());
    assert!(claim_pending_amazon_updates(&pool, user, 10, LEASE)
        .await
        .unwrap()
        .is_empty());

    record_amazon_outcome(&pool, id, false, "price_not_verified", Some("live price 649.00"))
        .await
        .unwrap();
    let status: String = sqlx::query_scalar("SELECT status FROM amazon_sync_queue WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "failed");

    let empty = NewAmazonQueueEntry {
        price: None,
        quantity: None,
        ..entry
    };
    assert!(matches!(
        enqueue_amazon_update(&pool, user, &empty).await,
        Err(DbError::InvalidInput { .. })
    ));
}

fn queue_entry(sku: &str) -> NewAmazonQueueEntry {
    NewAmazonQueueEntry {
        inventory_item_id: None,
        sku: sku.to_string(),
        asin: None,
        price: Some(d(1999)),
        quantity: Some(2),
    }
}

async fn queue_status(pool: &sqlx::PgPool, id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM amazon_sync_queue WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
async fn released_claims_return_to_pending(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let a = enqueue_amazon_update(&pool, user, &queue_entry("A")).await.unwrap();
    let b = enqueue_amazon_update(&pool, user, &queue_entry("B")).await.unwrap();
    claim_pending_amazon_updates(&pool, user, 10, LEASE).await.unwrap();

    record_amazon_outcome(&pool, a, true, "completed", None)
        .await
        .unwrap();
    let released = release_amazon_claims(&pool, &[a, b]).await.unwrap();
    assert_eq!(released, 1, "rows with an outcome stay put");
    assert_eq!(queue_status(&pool, a).await, "completed");
    assert_eq!(queue_status(&pool, b).await, "pending");

    // A late outcome for a released row is ignored.
    record_amazon_outcome(&pool, b, false, "price_feed_timeout", None)
        .await
        .unwrap();
    assert_eq!(queue_status(&pool, b).await, "pending");

    let again = claim_pending_amazon_updates(&pool, user, 10, LEASE).await.unwrap();
    assert_eq!(again.iter().map(|r| r.id).collect::<Vec<_>>(), vec![b]);
    assert_eq!(release_amazon_claims(&pool, &[]).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn stale_claims_are_reclaimed_after_the_lease(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let id = enqueue_amazon_update(&pool, user, &queue_entry("A")).await.unwrap();
    claim_pending_amazon_updates(&pool, user, 10, LEASE).await.unwrap();

    // The claimer vanished without releasing; within the lease nobody else may take it.
    assert!(claim_pending_amazon_updates(&pool, user, 10, LEASE)
        .await
        .unwrap()
        .is_empty());

    sqlx::query(
        "UPDATE amazon_sync_queue SET claimed_at = NOW() - INTERVAL '10 minutes' WHERE id = $1",
    )
    .bind(id)
    .execute(&pool)
    .await
    .unwrap();
    let reclaimed = claim_pending_amazon_updates(&pool, user, 10, LEASE).await.unwrap();
    assert_eq!(reclaimed.len(), 1);
    assert_eq!(reclaimed[0].id, id);
    assert!(reclaimed[0]
        .claimed_at
        .is_some_and(|at| at > Utc::now() - chrono::Duration::minutes(1)));

    // Other tenants' stale rows are never touched.
    assert!(claim_pending_amazon_updates(&pool, Uuid::new_v4(), 10, Duration::ZERO)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn sync_run_lifecycle(pool: sqlx::PgPool) {
    let user = Uuid::new_v4();
    let run = create_sync_run(&pool, user, "bricqer-orders", "cron")
        .await
        .unwrap();
    assert_eq!(run.status, "queued");

    assert!(matches!(
        complete_sync_run(&pool, run.id, 1).await,
        Err(DbError::InvalidSyncRunTransition {
            expected_status: "running",
            ..
        })
    ));

    start_sync_run(&pool, run.id).await.unwrap();
    complete_sync_run(&pool, run.id, 12).await.unwrap();

    let fetched = get_sync_run(&pool, run.id).await.unwrap();
    assert_eq!(fetched.status, "succeeded");
    assert_eq!(fetched.records_processed, 12);
    assert!(fetched.started_at.is_some());
    assert!(fetched.completed_at.is_some());

    assert!(
        fail_sync_run(&pool, run.id, "late failure").await.is_err(),
        "terminal runs stay terminal"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn queued_run_can_fail_without_starting(pool: sqlx::PgPool) {
    let run = create_sync_run(&pool, Uuid::new_v4(), "keepa-pricing", "api")
        .await
        .unwrap();

    fail_sync_run(&pool, run.id, "could not start run").await.unwrap();

    let fetched = get_sync_run(&pool, run.id).await.unwrap();
    assert_eq!(fetched.status, "failed");
    assert_eq!(fetched.error_message.as_deref(), Some("could not start run"));
    assert!(fetched.started_at.is_none());
}
