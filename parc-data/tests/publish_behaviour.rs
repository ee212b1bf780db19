//! Behavioural coverage for publishing feature layers.

use std::cell::RefCell;
use std::time::Duration;

use geo::{Geometry, Point};
use parc_core::{FeatureRow, FeatureTable, Value};
use parc_data::Secret;
use parc_data::portal::{
    FEATURE_SERVICE_ITEM_TYPE, GEOJSON_ITEM_TYPE, LayerTarget, PollSettings, PublishError,
    PublishedLayer, Publisher,
};
use parc_data::test_support::{InMemoryPortal, block_on_for_tests};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

type PortalPublisher = Publisher<InMemoryPortal>;

#[fixture]
fn portal() -> RefCell<InMemoryPortal> {
    RefCell::new(InMemoryPortal::default())
}

#[fixture]
fn publisher() -> RefCell<Option<PortalPublisher>> {
    RefCell::new(None)
}

#[fixture]
fn dataset() -> RefCell<Option<FeatureTable>> {
    RefCell::new(None)
}

#[fixture]
fn outcomes() -> RefCell<Vec<Result<PublishedLayer, PublishError>>> {
    RefCell::new(Vec::new())
}

fn connect(
    portal: &RefCell<InMemoryPortal>,
    publisher: &RefCell<Option<PortalPublisher>>,
    user: &str,
) -> Result<(), PublishError> {
    let mut connected = Publisher::new(portal.take()).with_poll_settings(PollSettings {
        interval: Duration::ZERO,
        max_polls: 3,
    });
    let result = block_on_for_tests(connected.connect(user, &Secret::new("password")));
    *publisher.borrow_mut() = Some(connected);
    result
}

fn with_portal<T>(
    publisher: &RefCell<Option<PortalPublisher>>,
    inspect: impl FnOnce(&InMemoryPortal) -> T,
) -> T {
    let guard = publisher.borrow();
    let publisher = guard.as_ref().expect("publisher was created");
    inspect(publisher.portal())
}

// --- Given steps ---

#[given("the portal rejects addItem requests")]
fn given_rejecting_portal(#[from(portal)] portal: &RefCell<InMemoryPortal>) {
    portal.replace(InMemoryPortal::default().failing_on("addItem"));
}

#[given("a portal that identifies no user")]
fn given_anonymous_portal(#[from(portal)] portal: &RefCell<InMemoryPortal>) {
    portal.replace(InMemoryPortal::default().anonymous());
}

#[given("a portal session for {user}")]
fn given_session(
    user: String,
    #[from(portal)] portal: &RefCell<InMemoryPortal>,
    #[from(publisher)] publisher: &RefCell<Option<PortalPublisher>>,
) {
    connect(portal, publisher, &user).expect("session opens");
}

#[given("a cleaned dataset with {count} features")]
fn given_dataset(count: usize, #[from(dataset)] dataset: &RefCell<Option<FeatureTable>>) {
    let mut table = FeatureTable::new(vec!["Name".to_owned(), "Park".to_owned()]);
    for index in 0..count {
        let offset = f64::from(u32::try_from(index).expect("small index")) * 0.01;
        table.push(FeatureRow {
            values: vec![Value::from(format!("Bench {index}")), Value::Null],
            geometry: Some(Geometry::Point(Point::new(-123.4 + offset, 48.4))),
        });
    }
    *dataset.borrow_mut() = Some(table);
}

// --- When steps ---

#[when("the dataset is published as {title}")]
fn when_published(
    title: String,
    #[from(publisher)] publisher: &RefCell<Option<PortalPublisher>>,
    #[from(dataset)] dataset: &RefCell<Option<FeatureTable>>,
    #[from(outcomes)] outcomes: &RefCell<Vec<Result<PublishedLayer, PublishError>>>,
) {
    let target = LayerTarget {
        title,
        file_base_name: "bcparks_assets_v2".to_owned(),
        description: "Point dataset - BCParks assets".to_owned(),
        folder: "PARC".to_owned(),
    };
    let table = dataset.borrow().clone().expect("dataset prepared");
    let guard = publisher.borrow();
    let publisher = guard.as_ref().expect("publisher was created");
    let outcome = block_on_for_tests(publisher.publish(&table, &target));
    outcomes.borrow_mut().push(outcome);
}

#[when("connecting as {user}")]
fn when_connecting(
    user: String,
    #[from(portal)] portal: &RefCell<InMemoryPortal>,
    #[from(publisher)] publisher: &RefCell<Option<PortalPublisher>>,
    #[from(outcomes)] outcomes: &RefCell<Vec<Result<PublishedLayer, PublishError>>>,
) {
    if let Err(err) = connect(portal, publisher, &user) {
        outcomes.borrow_mut().push(Err(err));
    }
}

// --- Then steps ---

#[then("exactly {count} GeoJSON item titled {title} remains")]
fn then_geojson_items(
    count: usize,
    title: String,
    #[from(publisher)] publisher: &RefCell<Option<PortalPublisher>>,
) {
    let live = with_portal(publisher, |portal| {
        portal.items_titled(&title, GEOJSON_ITEM_TYPE)
    });
    assert_eq!(live, count);
}

#[then("exactly {count} feature layer titled {title} remains")]
fn then_feature_layers(
    count: usize,
    title: String,
    #[from(publisher)] publisher: &RefCell<Option<PortalPublisher>>,
) {
    let live = with_portal(publisher, |portal| {
        portal.items_titled(&title, FEATURE_SERVICE_ITEM_TYPE)
    });
    assert_eq!(live, count);
}

#[then("both publishes kept the same feature layer")]
fn then_same_layer(
    #[from(outcomes)] outcomes: &RefCell<Vec<Result<PublishedLayer, PublishError>>>,
) {
    let outcomes = outcomes.borrow();
    let services: Vec<&str> = outcomes
        .iter()
        .map(|outcome| {
            outcome
                .as_ref()
                .map(|layer| layer.service_item_id.as_str())
                .expect("publish succeeded")
        })
        .collect();
    assert_eq!(services.len(), 2);
    assert_eq!(services.first(), services.last());
}

#[then("publishing fails for {title}")]
fn then_publish_fails(
    title: String,
    #[from(outcomes)] outcomes: &RefCell<Vec<Result<PublishedLayer, PublishError>>>,
) {
    let outcomes = outcomes.borrow();
    match outcomes.last().expect("a publish was attempted") {
        Err(PublishError::Publish { title: failed, .. }) => assert_eq!(failed, &title),
        other => panic!("expected a publish failure, got {other:?}"),
    }
}

#[then("no feature layer was published")]
fn then_nothing_published(#[from(publisher)] publisher: &RefCell<Option<PortalPublisher>>) {
    let published = with_portal(publisher, InMemoryPortal::published_titles);
    assert!(published.is_empty(), "published {published:?}");
}

#[then("the connection is refused")]
fn then_refused(
    #[from(publisher)] publisher: &RefCell<Option<PortalPublisher>>,
    #[from(outcomes)] outcomes: &RefCell<Vec<Result<PublishedLayer, PublishError>>>,
) {
    assert!(matches!(
        outcomes.borrow().last(),
        Some(Err(PublishError::NotAuthenticated))
    ));
    let connected = publisher
        .borrow()
        .as_ref()
        .is_some_and(PortalPublisher::is_connected);
    assert!(!connected);
}

// --- Scenario registrations ---

#[scenario(path = "tests/features/publish.feature", index = 0)]
fn republishing_overwrites_layer(
    portal: RefCell<InMemoryPortal>,
    publisher: RefCell<Option<PortalPublisher>>,
    dataset: RefCell<Option<FeatureTable>>,
    outcomes: RefCell<Vec<Result<PublishedLayer, PublishError>>>,
) {
    let _ = (portal, publisher, dataset, outcomes);
}

#[scenario(path = "tests/features/publish.feature", index = 1)]
fn rejected_upload_aborts(
    portal: RefCell<InMemoryPortal>,
    publisher: RefCell<Option<PortalPublisher>>,
    dataset: RefCell<Option<FeatureTable>>,
    outcomes: RefCell<Vec<Result<PublishedLayer, PublishError>>>,
) {
    let _ = (portal, publisher, dataset, outcomes);
}

#[scenario(path = "tests/features/publish.feature", index = 2)]
fn anonymous_credentials_refused(
    portal: RefCell<InMemoryPortal>,
    publisher: RefCell<Option<PortalPublisher>>,
    dataset: RefCell<Option<FeatureTable>>,
    outcomes: RefCell<Vec<Result<PublishedLayer, PublishError>>>,
) {
    let _ = (portal, publisher, dataset, outcomes);
}
