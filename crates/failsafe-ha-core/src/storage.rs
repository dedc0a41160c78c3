//! Repositories for segments, hosts and notifications.
//!
//! Controllers talk to the [`Repository`] trait only. The in-memory
//! implementation keeps every table in a [`DashMap`] keyed by uuid, with a
//! second map from name to uuid for the tables whose names are unique:
//!
//! ```text
//! segments:      DashMap<uuid, Segment>      segment_names: DashMap<name, uuid>
//! hosts:         DashMap<uuid, Host>         host_names:    DashMap<name, uuid>
//! notifications: DashMap<uuid, Notification>
//! ```
//!
//! Name reservations go through the `DashMap` entry API so two concurrent
//! creates with the same name cannot both succeed.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use failsafe_http::SortDir;
use failsafe_model::input::{HostCreate, HostUpdate, SegmentCreate, SegmentUpdate};
use failsafe_model::{Host, Notification, NotificationStatus, NotificationType, RecoveryMethod, Segment};
use tracing::debug;

use crate::error::RepositoryError;

pub const SEGMENT: &str = "Failover segment";
pub const HOST: &str = "Host";
pub const NOTIFICATION: &str = "Notification";

// ---------------------------------------------------------------------------
// Repository contract
// ---------------------------------------------------------------------------

/// Sorting and paging of a `get_all` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Sort keys in priority order; ties fall back to ascending id.
    pub sort: Vec<(String, SortDir)>,
    pub limit: usize,
    /// Uuid of the last item of the previous page.
    pub marker: Option<String>,
}

impl Page {
    /// Every item, unsorted.
    #[must_use]
    pub fn all() -> Self {
        Self {
            sort: Vec::new(),
            limit: usize::MAX,
            marker: None,
        }
    }
}

/// Persistence operations shared by every entity.
pub trait Repository: Send + Sync {
    type Entity;
    type Create;
    type Update;
    type Filters;

    fn get_by_uuid(&self, uuid: &str) -> Result<Self::Entity, RepositoryError>;

    fn get_all(&self, filters: &Self::Filters, page: &Page) -> Result<Vec<Self::Entity>, RepositoryError>;

    fn create(&self, input: Self::Create) -> Result<Self::Entity, RepositoryError>;

    fn update(&self, uuid: &str, input: Self::Update) -> Result<Self::Entity, RepositoryError>;

    fn destroy(&self, uuid: &str) -> Result<(), RepositoryError>;
}

pub type SegmentRepository =
    dyn Repository<Entity = Segment, Create = SegmentCreate, Update = SegmentUpdate, Filters = SegmentFilters>;

pub type HostRepository =
    dyn Repository<Entity = Host, Create = NewHost, Update = HostUpdate, Filters = HostFilters>;

pub type NotificationRepository = dyn Repository<
        Entity = Notification,
        Create = NewNotification,
        Update = NotificationUpdate,
        Filters = NotificationFilters,
    >;

// ---------------------------------------------------------------------------
// Inputs and filters
// ---------------------------------------------------------------------------

/// A host to add to a segment.
#[derive(Debug, Clone)]
pub struct NewHost {
    pub segment_uuid: String,
    pub host: HostCreate,
}

/// A notification accepted from a monitor; it is stored with status `new`.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub notification_type: NotificationType,
    pub generated_time: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub source_host_uuid: String,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationUpdate {
    pub status: Option<NotificationStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentFilters {
    pub recovery_method: Option<RecoveryMethod>,
    pub service_type: Option<String>,
    pub enabled: Option<bool>,
}

impl SegmentFilters {
    fn matches(&self, segment: &Segment) -> bool {
        self.recovery_method.is_none_or(|m| m == segment.recovery_method)
            && self.service_type.as_ref().is_none_or(|t| *t == segment.service_type)
            && self.enabled.is_none_or(|e| e == segment.enabled)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFilters {
    pub segment_uuid: Option<String>,
    pub name: Option<String>,
    pub host_type: Option<String>,
    pub control_attributes: Option<String>,
    pub on_maintenance: Option<bool>,
    pub reserved: Option<bool>,
}

impl HostFilters {
    fn matches(&self, host: &Host) -> bool {
        self.segment_uuid.as_ref().is_none_or(|s| *s == host.failover_segment_id)
            && self.name.as_ref().is_none_or(|n| *n == host.name)
            && self.host_type.as_ref().is_none_or(|t| *t == host.host_type)
            && self
                .control_attributes
                .as_ref()
                .is_none_or(|c| *c == host.control_attributes)
            && self.on_maintenance.is_none_or(|m| m == host.on_maintenance)
            && self.reserved.is_none_or(|r| r == host.reserved)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilters {
    pub source_host_uuid: Option<String>,
    pub notification_type: Option<NotificationType>,
    pub status: Option<NotificationStatus>,
    /// Only notifications generated at or after this time.
    pub generated_since: Option<DateTime<Utc>>,
}

impl NotificationFilters {
    fn matches(&self, notification: &Notification) -> bool {
        self.source_host_uuid
            .as_ref()
            .is_none_or(|h| *h == notification.source_host_uuid)
            && self
                .notification_type
                .is_none_or(|t| t == notification.notification_type)
            && self.status.is_none_or(|s| s == notification.status)
            && self
                .generated_since
                .is_none_or(|since| notification.generated_time >= since)
    }
}

// ---------------------------------------------------------------------------
// Sorting and paging
// ---------------------------------------------------------------------------

/// A comparable attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Null,
    Bool(bool),
    Int(u64),
    Text(String),
    Time(DateTime<Utc>),
}

impl From<Option<DateTime<Utc>>> for SortValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Null, Self::Time)
    }
}

/// Entities that can be sorted and paged.
pub trait Sortable {
    fn id(&self) -> u64;
    fn uuid(&self) -> &str;
    /// Value of a sort key; unknown keys compare equal.
    fn sort_value(&self, key: &str) -> SortValue;
}

impl Sortable for Segment {
    fn id(&self) -> u64 {
        self.id
    }

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "id" => SortValue::Int(self.id),
            "uuid" => SortValue::Text(self.uuid.clone()),
            "name" => SortValue::Text(self.name.clone()),
            "description" => self.description.clone().map_or(SortValue::Null, SortValue::Text),
            "recovery_method" => SortValue::Text(self.recovery_method.as_str().to_owned()),
            "service_type" => SortValue::Text(self.service_type.clone()),
            "created_at" => SortValue::Time(self.created_at),
            "updated_at" => self.updated_at.into(),
            _ => SortValue::Null,
        }
    }
}

impl Sortable for Host {
    fn id(&self) -> u64 {
        self.id
    }

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "id" => SortValue::Int(self.id),
            "uuid" => SortValue::Text(self.uuid.clone()),
            "name" => SortValue::Text(self.name.clone()),
            "type" => SortValue::Text(self.host_type.clone()),
            "reserved" => SortValue::Bool(self.reserved),
            "on_maintenance" => SortValue::Bool(self.on_maintenance),
            "created_at" => SortValue::Time(self.created_at),
            "updated_at" => self.updated_at.into(),
            _ => SortValue::Null,
        }
    }
}

impl Sortable for Notification {
    fn id(&self) -> u64 {
        self.id
    }

    fn uuid(&self) -> &str {
        &self.notification_uuid
    }

    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "id" => SortValue::Int(self.id),
            "type" => SortValue::Text(self.notification_type.as_str().to_owned()),
            "status" => SortValue::Text(self.status.as_str().to_owned()),
            "source_host_uuid" => SortValue::Text(self.source_host_uuid.clone()),
            "generated_time" => SortValue::Time(self.generated_time),
            "created_at" => SortValue::Time(self.created_at),
            "updated_at" => self.updated_at.into(),
            _ => SortValue::Null,
        }
    }
}

/// Sort `items`, skip past the marker and cut the page.
pub fn paginate<T: Sortable>(mut items: Vec<T>, page: &Page) -> Result<Vec<T>, RepositoryError> {
    items.sort_by(|a, b| {
        for (key, dir) in &page.sort {
            let ord = a.sort_value(key).cmp(&b.sort_value(key));
            let ord = match dir {
                SortDir::Asc => ord,
                SortDir::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.id().cmp(&b.id())
    });

    let start = match &page.marker {
        None => 0,
        Some(marker) => items
            .iter()
            .position(|item| item.uuid() == marker)
            .map(|pos| pos + 1)
            .ok_or_else(|| RepositoryError::InvalidMarker(marker.clone()))?,
    };

    Ok(items.into_iter().skip(start).take(page.limit).collect())
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Tables shared by the in-memory repositories.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    segments: DashMap<String, Segment>,
    segment_names: DashMap<String, String>,
    hosts: DashMap<String, Host>,
    host_names: DashMap<String, String>,
    notifications: DashMap<String, Notification>,
    segment_ids: AtomicU64,
    host_ids: AtomicU64,
    notification_ids: AtomicU64,
}

impl MemoryDatabase {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Remove every row.
    pub fn reset(&self) {
        self.notifications.clear();
        self.hosts.clear();
        self.host_names.clear();
        self.segments.clear();
        self.segment_names.clear();
    }
}

fn next_id(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, AtomicOrdering::Relaxed) + 1
}

fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Move a unique name from `old` to `new`, failing if `new` is taken.
fn rename(
    names: &DashMap<String, String>,
    kind: &'static str,
    uuid: &str,
    old: &str,
    new: &str,
) -> Result<(), RepositoryError> {
    if old == new {
        return Ok(());
    }
    match names.entry(new.to_owned()) {
        Entry::Occupied(_) => {
            return Err(RepositoryError::AlreadyExists {
                kind,
                name: new.to_owned(),
            });
        }
        Entry::Vacant(e) => {
            e.insert(uuid.to_owned());
        }
    }
    names.remove(old);
    Ok(())
}

/// In-memory segment repository.
#[derive(Debug, Clone)]
pub struct MemorySegments {
    db: Arc<MemoryDatabase>,
}

impl MemorySegments {
    #[must_use]
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

impl Repository for MemorySegments {
    type Entity = Segment;
    type Create = SegmentCreate;
    type Update = SegmentUpdate;
    type Filters = SegmentFilters;

    fn get_by_uuid(&self, uuid: &str) -> Result<Segment, RepositoryError> {
        self.db
            .segments
            .get(uuid)
            .map(|r| r.value().clone())
            .ok_or_else(|| RepositoryError::not_found(SEGMENT, uuid))
    }

    fn get_all(&self, filters: &SegmentFilters, page: &Page) -> Result<Vec<Segment>, RepositoryError> {
        let items = self
            .db
            .segments
            .iter()
            .filter(|r| filters.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        paginate(items, page)
    }

    fn create(&self, input: SegmentCreate) -> Result<Segment, RepositoryError> {
        let uuid = new_uuid();
        match self.db.segment_names.entry(input.name.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::AlreadyExists {
                kind: SEGMENT,
                name: input.name,
            }),
            Entry::Vacant(e) => {
                let segment = Segment {
                    id: next_id(&self.db.segment_ids),
                    uuid: uuid.clone(),
                    name: input.name,
                    description: input.description,
                    recovery_method: input.recovery_method,
                    service_type: input.service_type,
                    enabled: input.enabled.unwrap_or(true),
                    created_at: Utc::now(),
                    updated_at: None,
                };
                e.insert(uuid.clone());
                self.db.segments.insert(uuid, segment.clone());
                debug!(uuid = %segment.uuid, name = %segment.name, "created segment");
                Ok(segment)
            }
        }
    }

    fn update(&self, uuid: &str, input: SegmentUpdate) -> Result<Segment, RepositoryError> {
        let mut segment = self
            .db
            .segments
            .get_mut(uuid)
            .ok_or_else(|| RepositoryError::not_found(SEGMENT, uuid))?;

        if let Some(name) = input.name {
            rename(&self.db.segment_names, SEGMENT, uuid, &segment.name, &name)?;
            segment.name = name;
        }
        if let Some(description) = input.description {
            segment.description = description;
        }
        if let Some(method) = input.recovery_method {
            segment.recovery_method = method;
        }
        if let Some(service_type) = input.service_type {
            segment.service_type = service_type;
        }
        if let Some(enabled) = input.enabled {
            segment.enabled = enabled;
        }
        segment.updated_at = Some(Utc::now());
        Ok(segment.value().clone())
    }

    /// Delete a segment together with every host registered in it.
    fn destroy(&self, uuid: &str) -> Result<(), RepositoryError> {
        let (_, segment) = self
            .db
            .segments
            .remove(uuid)
            .ok_or_else(|| RepositoryError::not_found(SEGMENT, uuid))?;
        self.db.segment_names.remove(&segment.name);

        let hosts: Vec<String> = self
            .db
            .hosts
            .iter()
            .filter(|r| r.failover_segment_id == uuid)
            .map(|r| r.key().clone())
            .collect();
        for host_uuid in &hosts {
            if let Some((_, host)) = self.db.hosts.remove(host_uuid) {
                self.db.host_names.remove(&host.name);
            }
        }
        debug!(uuid, hosts = hosts.len(), "deleted segment");
        Ok(())
    }
}

/// In-memory host repository.
#[derive(Debug, Clone)]
pub struct MemoryHosts {
    db: Arc<MemoryDatabase>,
}

impl MemoryHosts {
    #[must_use]
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

impl Repository for MemoryHosts {
    type Entity = Host;
    type Create = NewHost;
    type Update = HostUpdate;
    type Filters = HostFilters;

    fn get_by_uuid(&self, uuid: &str) -> Result<Host, RepositoryError> {
        self.db
            .hosts
            .get(uuid)
            .map(|r| r.value().clone())
            .ok_or_else(|| RepositoryError::not_found(HOST, uuid))
    }

    fn get_all(&self, filters: &HostFilters, page: &Page) -> Result<Vec<Host>, RepositoryError> {
        let items = self
            .db
            .hosts
            .iter()
            .filter(|r| filters.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        paginate(items, page)
    }

    fn create(&self, input: NewHost) -> Result<Host, RepositoryError> {
        let NewHost { segment_uuid, host } = input;
        if !self.db.segments.contains_key(&segment_uuid) {
            return Err(RepositoryError::not_found(SEGMENT, segment_uuid));
        }

        let uuid = new_uuid();
        match self.db.host_names.entry(host.name.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::AlreadyExists {
                kind: HOST,
                name: host.name,
            }),
            Entry::Vacant(e) => {
                let host = Host {
                    id: next_id(&self.db.host_ids),
                    uuid: uuid.clone(),
                    name: host.name,
                    host_type: host.host_type,
                    control_attributes: host.control_attributes,
                    reserved: host.reserved.unwrap_or(false),
                    on_maintenance: host.on_maintenance.unwrap_or(false),
                    failover_segment_id: segment_uuid,
                    created_at: Utc::now(),
                    updated_at: None,
                };
                e.insert(uuid.clone());
                self.db.hosts.insert(uuid, host.clone());
                debug!(uuid = %host.uuid, name = %host.name, segment = %host.failover_segment_id, "created host");
                Ok(host)
            }
        }
    }

    fn update(&self, uuid: &str, input: HostUpdate) -> Result<Host, RepositoryError> {
        let mut host = self
            .db
            .hosts
            .get_mut(uuid)
            .ok_or_else(|| RepositoryError::not_found(HOST, uuid))?;

        if let Some(name) = input.name {
            rename(&self.db.host_names, HOST, uuid, &host.name, &name)?;
            host.name = name;
        }
        if let Some(host_type) = input.host_type {
            host.host_type = host_type;
        }
        if let Some(attributes) = input.control_attributes {
            host.control_attributes = attributes;
        }
        if let Some(reserved) = input.reserved {
            host.reserved = reserved;
        }
        if let Some(on_maintenance) = input.on_maintenance {
            host.on_maintenance = on_maintenance;
        }
        host.updated_at = Some(Utc::now());
        Ok(host.value().clone())
    }

    fn destroy(&self, uuid: &str) -> Result<(), RepositoryError> {
        let (_, host) = self
            .db
            .hosts
            .remove(uuid)
            .ok_or_else(|| RepositoryError::not_found(HOST, uuid))?;
        self.db.host_names.remove(&host.name);
        Ok(())
    }
}

/// In-memory notification repository.
#[derive(Debug, Clone)]
pub struct MemoryNotifications {
    db: Arc<MemoryDatabase>,
}

impl MemoryNotifications {
    #[must_use]
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }
}

impl Repository for MemoryNotifications {
    type Entity = Notification;
    type Create = NewNotification;
    type Update = NotificationUpdate;
    type Filters = NotificationFilters;

    fn get_by_uuid(&self, uuid: &str) -> Result<Notification, RepositoryError> {
        self.db
            .notifications
            .get(uuid)
            .map(|r| r.value().clone())
            .ok_or_else(|| RepositoryError::not_found(NOTIFICATION, uuid))
    }

    fn get_all(
        &self,
        filters: &NotificationFilters,
        page: &Page,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let items = self
            .db
            .notifications
            .iter()
            .filter(|r| filters.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        paginate(items, page)
    }

    fn create(&self, input: NewNotification) -> Result<Notification, RepositoryError> {
        let notification = Notification {
            id: next_id(&self.db.notification_ids),
            notification_uuid: new_uuid(),
            generated_time: input.generated_time,
            notification_type: input.notification_type,
            payload: input.payload,
            source_host_uuid: input.source_host_uuid,
            status: NotificationStatus::New,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.db
            .notifications
            .insert(notification.notification_uuid.clone(), notification.clone());
        Ok(notification)
    }

    fn update(&self, uuid: &str, input: NotificationUpdate) -> Result<Notification, RepositoryError> {
        let mut notification = self
            .db
            .notifications
            .get_mut(uuid)
            .ok_or_else(|| RepositoryError::not_found(NOTIFICATION, uuid))?;
        if let Some(status) = input.status {
            notification.status = status;
        }
        notification.updated_at = Some(Utc::now());
        Ok(notification.value().clone())
    }

    fn destroy(&self, uuid: &str) -> Result<(), RepositoryError> {
        self.db
            .notifications
            .remove(uuid)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found(NOTIFICATION, uuid))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn segment_input(name: &str) -> SegmentCreate {
        SegmentCreate {
            name: name.to_owned(),
            description: None,
            recovery_method: RecoveryMethod::Auto,
            service_type: "COMPUTE".to_owned(),
            enabled: None,
        }
    }

    fn host_input(segment_uuid: &str, name: &str) -> NewHost {
        NewHost {
            segment_uuid: segment_uuid.to_owned(),
            host: HostCreate {
                name: name.to_owned(),
                host_type: "COMPUTE".to_owned(),
                control_attributes: "ssh".to_owned(),
                reserved: None,
                on_maintenance: None,
            },
        }
    }

    fn repos() -> (MemorySegments, MemoryHosts, MemoryNotifications) {
        let db = MemoryDatabase::new();
        (
            MemorySegments::new(Arc::clone(&db)),
            MemoryHosts::new(Arc::clone(&db)),
            MemoryNotifications::new(db),
        )
    }

    #[test]
    fn test_should_create_and_fetch_segment() {
        let (segments, _, _) = repos();
        let created = segments.create(segment_input("s1")).unwrap();
        assert_eq!(created.id, 1);
        assert!(created.enabled);
        assert_eq!(segments.get_by_uuid(&created.uuid).unwrap(), created);
        assert!(matches!(
            segments.get_by_uuid("missing"),
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_should_reject_duplicate_names() {
        let (segments, hosts, _) = repos();
        let s = segments.create(segment_input("s1")).unwrap();
        assert!(matches!(
            segments.create(segment_input("s1")),
            Err(RepositoryError::AlreadyExists { .. })
        ));

        hosts.create(host_input(&s.uuid, "h1")).unwrap();
        assert!(matches!(
            hosts.create(host_input(&s.uuid, "h1")),
            Err(RepositoryError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_should_rename_and_release_old_name() {
        let (segments, _, _) = repos();
        let a = segments.create(segment_input("a")).unwrap();
        segments.create(segment_input("b")).unwrap();

        let rename_to = |name: &str| SegmentUpdate {
            name: Some(name.to_owned()),
            ..SegmentUpdate::default()
        };
        assert!(segments.update(&a.uuid, rename_to("b")).is_err());

        let renamed = segments.update(&a.uuid, rename_to("c")).unwrap();
        assert_eq!(renamed.name, "c");
        assert!(renamed.updated_at.is_some());
        segments.create(segment_input("a")).unwrap();
    }

    #[test]
    fn test_should_clear_description_on_explicit_null() {
        let (segments, _, _) = repos();
        let mut input = segment_input("s1");
        input.description = Some("old".into());
        let s = segments.create(input).unwrap();

        let updated = segments
            .update(
                &s.uuid,
                SegmentUpdate {
                    description: Some(None),
                    ..SegmentUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(updated.description, None);
    }

    #[test]
    fn test_should_cascade_segment_delete_to_hosts() {
        let (segments, hosts, _) = repos();
        let s = segments.create(segment_input("s1")).unwrap();
        let h = hosts.create(host_input(&s.uuid, "h1")).unwrap();

        segments.destroy(&s.uuid).unwrap();
        assert!(hosts.get_by_uuid(&h.uuid).is_err());
        let s2 = segments.create(segment_input("s2")).unwrap();
        hosts.create(host_input(&s2.uuid, "h1")).unwrap();
    }

    #[test]
    fn test_should_require_existing_segment_for_host() {
        let (_, hosts, _) = repos();
        let err = hosts.create(host_input("nope", "h1")).unwrap_err();
        assert_eq!(err.to_string(), "Failover segment nope could not be found.");
    }

    #[test]
    fn test_should_sort_and_page_with_marker() {
        let (segments, _, _) = repos();
        for name in ["c", "a", "b"] {
            segments.create(segment_input(name)).unwrap();
        }

        let page = Page {
            sort: vec![("name".to_owned(), SortDir::Asc)],
            limit: 2,
            marker: None,
        };
        let first = segments.get_all(&SegmentFilters::default(), &page).unwrap();
        let names: Vec<&str> = first.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        let next = Page {
            marker: Some(first[1].uuid.clone()),
            ..page
        };
        let second = segments.get_all(&SegmentFilters::default(), &next).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "c");
    }

    #[test]
    fn test_should_reject_unknown_marker() {
        let (segments, _, _) = repos();
        let page = Page {
            marker: Some("missing".into()),
            ..Page::all()
        };
        assert!(matches!(
            segments.get_all(&SegmentFilters::default(), &page),
            Err(RepositoryError::InvalidMarker(m)) if m == "missing"
        ));
    }

    #[test]
    fn test_should_filter_hosts_by_segment_and_flags() {
        let (segments, hosts, _) = repos();
        let s1 = segments.create(segment_input("s1")).unwrap();
        let s2 = segments.create(segment_input("s2")).unwrap();
        hosts.create(host_input(&s1.uuid, "h1")).unwrap();
        let mut reserved = host_input(&s1.uuid, "h2");
        reserved.host.reserved = Some(true);
        hosts.create(reserved).unwrap();
        hosts.create(host_input(&s2.uuid, "h3")).unwrap();

        let filters = HostFilters {
            segment_uuid: Some(s1.uuid.clone()),
            ..HostFilters::default()
        };
        assert_eq!(hosts.get_all(&filters, &Page::all()).unwrap().len(), 2);

        let filters = HostFilters {
            reserved: Some(true),
            ..filters
        };
        let found = hosts.get_all(&filters, &Page::all()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "h2");
    }

    #[test]
    fn test_should_store_notifications_as_new() {
        let (_, _, notifications) = repos();
        let generated = Utc::now();
        let n = notifications
            .create(NewNotification {
                notification_type: NotificationType::Vm,
                generated_time: generated,
                payload: json!({"event": "LIFECYCLE"}),
                source_host_uuid: "host-1".into(),
            })
            .unwrap();
        assert_eq!(n.status, NotificationStatus::New);

        let filters = NotificationFilters {
            generated_since: Some(generated + chrono::Duration::seconds(1)),
            ..NotificationFilters::default()
        };
        assert!(notifications.get_all(&filters, &Page::all()).unwrap().is_empty());

        let updated = notifications
            .update(
                &n.notification_uuid,
                NotificationUpdate {
                    status: Some(NotificationStatus::Running),
                },
            )
            .unwrap();
        assert_eq!(updated.status, NotificationStatus::Running);
    }
}
